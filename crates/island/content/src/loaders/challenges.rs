//! Challenge catalog loader.

use std::path::Path;

use island_core::{ChallengeDefinition, ChallengeRegistry};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Catalog shipped with the crate, used when no data directory overrides it.
const BUNDLED_CATALOG: &str = include_str!("../../data/challenges.ron");

/// Challenge catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeCatalog {
    pub challenges: Vec<ChallengeDefinition>,
}

/// Loader for challenge catalogs from RON files.
pub struct ChallengeLoader;

impl ChallengeLoader {
    /// Load challenge definitions from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<ChallengeDefinition>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse challenge definitions from RON text.
    pub fn parse(content: &str) -> LoadResult<Vec<ChallengeDefinition>> {
        let catalog: ChallengeCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse challenge catalog RON: {}", e))?;

        Ok(catalog.challenges)
    }

    /// Load a catalog and build the validated registry from it.
    pub fn load_registry(path: &Path) -> LoadResult<ChallengeRegistry> {
        let definitions = Self::load(path)?;
        ChallengeRegistry::new(definitions)
            .map_err(|e| anyhow::anyhow!("Invalid challenge catalog {}: {}", path.display(), e))
    }

    /// Registry built from the bundled catalog.
    pub fn bundled() -> LoadResult<ChallengeRegistry> {
        let definitions = Self::parse(BUNDLED_CATALOG)?;
        ChallengeRegistry::new(definitions)
            .map_err(|e| anyhow::anyhow!("Invalid bundled challenge catalog: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use island_core::{ChallengeId, ChallengeScope};

    #[test]
    fn test_bundled_catalog_is_valid() {
        let registry = ChallengeLoader::bundled().unwrap();
        assert!(!registry.is_empty());

        let builder = registry.get(&ChallengeId::new("master_builder")).unwrap();
        assert_eq!(builder.prerequisites, vec![ChallengeId::new("first_steps")]);
    }

    #[test]
    fn test_parse_defaults_optional_fields() {
        let definitions = ChallengeLoader::parse(
            r#"(
                challenges: [
                    (
                        id: "farmer",
                        name: "Farmer",
                        category: "farming",
                        reward: 15,
                        metric: "crops_harvested",
                        target: 64,
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].scope, ChallengeScope::Island);
        assert!(definitions[0].prerequisites.is_empty());
    }

    #[test]
    fn test_load_registry_rejects_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("challenges.ron");
        std::fs::write(
            &path,
            r#"(
                challenges: [
                    (id: "a", name: "A", category: "c", reward: 1, metric: "m", target: 1, prerequisites: ["b"]),
                    (id: "b", name: "B", category: "c", reward: 1, metric: "m", target: 1, prerequisites: ["a"]),
                ],
            )"#,
        )
        .unwrap();

        let err = ChallengeLoader::load_registry(&path).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
