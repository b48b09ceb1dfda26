//! Startup-built challenge registry.
//!
//! The registry is constructed once from a list of definitions, validated as
//! a DAG, and shared read-only afterwards. There is no way to register or
//! mutate a definition after construction.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::ChallengeDefinition;
use crate::ids::ChallengeId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("challenge {0} is defined more than once")]
    Duplicate(ChallengeId),

    #[error("challenge {challenge} requires unknown challenge {missing}")]
    UnknownPrerequisite {
        challenge: ChallengeId,
        missing: ChallengeId,
    },

    #[error("prerequisite cycle: {}", format_cycle(.0))]
    Cycle(Vec<ChallengeId>),

    #[error("challenge {0} has a zero target")]
    ZeroTarget(ChallengeId),
}

fn format_cycle(path: &[ChallengeId]) -> String {
    path.iter()
        .map(ChallengeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Read-only map of challenge definitions with an acyclic prerequisite graph.
#[derive(Clone, Debug, Default)]
pub struct ChallengeRegistry {
    definitions: BTreeMap<ChallengeId, ChallengeDefinition>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl ChallengeRegistry {
    /// Builds and validates the registry.
    pub fn new(
        definitions: impl IntoIterator<Item = ChallengeDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for definition in definitions {
            if definition.target == 0 {
                return Err(RegistryError::ZeroTarget(definition.id));
            }
            if map.contains_key(&definition.id) {
                return Err(RegistryError::Duplicate(definition.id));
            }
            map.insert(definition.id.clone(), definition);
        }

        for definition in map.values() {
            if let Some(missing) = definition
                .prerequisites
                .iter()
                .find(|id| !map.contains_key(*id))
            {
                return Err(RegistryError::UnknownPrerequisite {
                    challenge: definition.id.clone(),
                    missing: missing.clone(),
                });
            }
        }

        let registry = Self { definitions: map };
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Depth-first walk with visiting/done marks; a back edge is a cycle.
    fn check_acyclic(&self) -> Result<(), RegistryError> {
        let mut marks: HashMap<&ChallengeId, Mark> = HashMap::new();

        for root in self.definitions.keys() {
            if marks.contains_key(root) {
                continue;
            }

            // (node, index of next prerequisite to visit)
            let mut stack: Vec<(&ChallengeId, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::Visiting);

            while let Some((node, next)) = stack.last_mut() {
                let prerequisites = &self.definitions[*node].prerequisites;
                if let Some(child) = prerequisites.get(*next) {
                    *next += 1;
                    match marks.get(child) {
                        Some(Mark::Done) => {}
                        Some(Mark::Visiting) => {
                            let start = stack
                                .iter()
                                .position(|(id, _)| *id == child)
                                .unwrap_or(0);
                            let mut cycle: Vec<ChallengeId> =
                                stack[start..].iter().map(|(id, _)| (*id).clone()).collect();
                            cycle.push(child.clone());
                            return Err(RegistryError::Cycle(cycle));
                        }
                        None => {
                            marks.insert(child, Mark::Visiting);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    marks.insert(*node, Mark::Done);
                    stack.pop();
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, id: &ChallengeId) -> Option<&ChallengeDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &ChallengeId) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChallengeDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ChallengeDefinition> + 'a {
        self.iter().filter(move |def| def.category == category)
    }

    /// Challenges counting `metric`.
    pub fn by_metric<'a>(
        &'a self,
        metric: &'a str,
    ) -> impl Iterator<Item = &'a ChallengeDefinition> + 'a {
        self.iter().filter(move |def| def.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{ChallengeScope, Difficulty};

    fn def(id: &str, prerequisites: &[&str]) -> ChallengeDefinition {
        ChallengeDefinition {
            id: ChallengeId::new(id),
            name: id.to_string(),
            category: "test".into(),
            difficulty: Difficulty::Easy,
            reward: 5,
            metric: "blocks_placed".into(),
            target: 10,
            scope: ChallengeScope::Island,
            prerequisites: prerequisites.iter().map(|p| ChallengeId::new(*p)).collect(),
        }
    }

    #[test]
    fn test_builds_valid_dag() {
        let registry = ChallengeRegistry::new(vec![
            def("a", &[]),
            def("b", &["a"]),
            def("c", &["a", "b"]),
        ])
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&ChallengeId::new("c")));
        assert_eq!(registry.by_category("test").count(), 3);
    }

    #[test]
    fn test_rejects_duplicate() {
        let err = ChallengeRegistry::new(vec![def("a", &[]), def("a", &[])]).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate(ChallengeId::new("a")));
    }

    #[test]
    fn test_rejects_unknown_prerequisite() {
        let err = ChallengeRegistry::new(vec![def("a", &["ghost"])]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownPrerequisite { .. }));
    }

    #[test]
    fn test_rejects_cycle() {
        let err = ChallengeRegistry::new(vec![
            def("a", &["c"]),
            def("b", &["a"]),
            def("c", &["b"]),
        ])
        .unwrap_err();

        match err {
            RegistryError::Cycle(path) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_self_loop() {
        let err = ChallengeRegistry::new(vec![def("a", &["a"])]).unwrap_err();
        assert!(matches!(err, RegistryError::Cycle(_)));
    }

    #[test]
    fn test_rejects_zero_target() {
        let mut zero = def("a", &[]);
        zero.target = 0;
        let err = ChallengeRegistry::new(vec![zero]).unwrap_err();
        assert_eq!(err, RegistryError::ZeroTarget(ChallengeId::new("a")));
    }
}
