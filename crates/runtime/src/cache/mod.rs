//! Concurrent in-memory index of loaded islands.
//!
//! The cache never talks to the store or the realm backend. It only records
//! which islands are loaded, who occupies them, and who has visited them
//! since they were loaded.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use island_core::{Island, IslandId, PlayerId};
use tokio::sync::Mutex;

/// One loaded island.
///
/// `state` is the authoritative in-process copy and the per-island
/// serialization point: every mutation of a loaded island happens while
/// holding it.
#[derive(Debug)]
pub struct IslandEntry {
    pub id: IslandId,
    pub owner: PlayerId,
    pub state: Arc<Mutex<Island>>,
}

impl IslandEntry {
    fn new(island: Island) -> Self {
        Self {
            id: island.id,
            owner: island.owner,
            state: Arc::new(Mutex::new(island)),
        }
    }
}

/// What [`IslandCache::mark_occupant_enter`] observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisitRecord {
    /// First entry by this player since the island was cached.
    pub first_visit: bool,
    /// Island the player occupied before, if it was a different one.
    pub previous: Option<IslandId>,
}

#[derive(Default)]
pub struct IslandCache {
    by_id: DashMap<IslandId, Arc<IslandEntry>>,
    by_owner: DashMap<PlayerId, IslandId>,
    occupants: DashMap<IslandId, HashSet<PlayerId>>,
    visitors: DashMap<IslandId, HashSet<PlayerId>>,
    locations: DashMap<PlayerId, IslandId>,
}

impl IslandCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a loaded island. If the id is already cached the existing
    /// entry wins and is returned, so at most one instance is ever live.
    pub fn put(&self, island: Island) -> Arc<IslandEntry> {
        let entry = match self.by_id.entry(island.id) {
            Entry::Occupied(existing) => return Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                let entry = Arc::new(IslandEntry::new(island));
                slot.insert(Arc::clone(&entry));
                entry
            }
        };
        self.by_owner.insert(entry.owner, entry.id);
        self.occupants.entry(entry.id).or_default();
        self.visitors.entry(entry.id).or_default();
        entry
    }

    pub fn get(&self, id: IslandId) -> Option<Arc<IslandEntry>> {
        self.by_id.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Owner lookup, resolved through the primary map.
    pub fn get_by_owner(&self, owner: PlayerId) -> Option<Arc<IslandEntry>> {
        let id = *self.by_owner.get(&owner)?;
        self.get(id).filter(|entry| entry.owner == owner)
    }

    pub fn is_loaded(&self, id: IslandId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// True while `entry` is still the cached instance for its id.
    pub fn holds(&self, entry: &Arc<IslandEntry>) -> bool {
        self.by_id
            .get(&entry.id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), entry))
    }

    /// Drops an island and its occupancy and visitor history.
    pub fn remove(&self, id: IslandId) -> Option<Arc<IslandEntry>> {
        let (_, entry) = self.by_id.remove(&id)?;
        self.by_owner.remove_if(&entry.owner, |_, cached| *cached == id);

        if let Some((_, occupants)) = self.occupants.remove(&id) {
            for player in occupants {
                self.locations.remove_if(&player, |_, at| *at == id);
            }
        }
        self.visitors.remove(&id);
        Some(entry)
    }

    /// Records `player` inside island `id`, leaving any other island first.
    ///
    /// Returns `None` when the island is not loaded.
    pub fn mark_occupant_enter(&self, id: IslandId, player: PlayerId) -> Option<VisitRecord> {
        if !self.is_loaded(id) {
            return None;
        }

        let previous = self
            .locations
            .insert(player, id)
            .filter(|previous| *previous != id);
        if let Some(previous) = previous
            && let Some(mut occupants) = self.occupants.get_mut(&previous)
        {
            occupants.remove(&player);
        }

        self.occupants.entry(id).or_default().insert(player);
        let first_visit = self.visitors.entry(id).or_default().insert(player);

        Some(VisitRecord {
            first_visit,
            previous,
        })
    }

    /// Returns whether the player was inside the island.
    pub fn mark_occupant_leave(&self, id: IslandId, player: PlayerId) -> bool {
        let removed = self
            .occupants
            .get_mut(&id)
            .is_some_and(|mut occupants| occupants.remove(&player));
        self.locations.remove_if(&player, |_, at| *at == id);
        removed
    }

    pub fn occupants(&self, id: IslandId) -> Vec<PlayerId> {
        self.occupants
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn occupant_count(&self, id: IslandId) -> usize {
        self.occupants.get(&id).map_or(0, |set| set.len())
    }

    pub fn is_occupant(&self, id: IslandId, player: PlayerId) -> bool {
        self.occupants
            .get(&id)
            .is_some_and(|set| set.contains(&player))
    }

    /// Island the player currently occupies.
    pub fn located(&self, player: PlayerId) -> Option<IslandId> {
        self.locations.get(&player).map(|at| *at)
    }

    pub fn loaded_ids(&self) -> Vec<IslandId> {
        self.by_id.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&self) {
        self.by_id.clear();
        self.by_owner.clear();
        self.occupants.clear();
        self.visitors.clear();
        self.locations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use island_core::IslandType;

    fn island() -> Island {
        Island::new(
            IslandId::random(),
            PlayerId::random(),
            IslandType::Classic,
            Utc::now(),
        )
    }

    #[test]
    fn test_id_and_owner_lookups_share_one_entry() {
        let cache = IslandCache::new();
        let record = island();
        let (id, owner) = (record.id, record.owner);

        let entry = cache.put(record);
        let by_id = cache.get(id).unwrap();
        let by_owner = cache.get_by_owner(owner).unwrap();

        assert!(Arc::ptr_eq(&entry, &by_id));
        assert!(Arc::ptr_eq(&by_id, &by_owner));
        assert!(cache.holds(&entry));
    }

    #[test]
    fn test_second_put_keeps_first_instance() {
        let cache = IslandCache::new();
        let record = island();
        let first = cache.put(record.clone());
        let second = cache.put(record);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_clears_owner_index_and_occupancy() {
        let cache = IslandCache::new();
        let record = island();
        let (id, owner) = (record.id, record.owner);
        let entry = cache.put(record);
        let player = PlayerId::random();
        cache.mark_occupant_enter(id, player).unwrap();

        cache.remove(id).unwrap();

        assert!(!cache.is_loaded(id));
        assert!(cache.get_by_owner(owner).is_none());
        assert!(cache.located(player).is_none());
        assert!(!cache.holds(&entry));
    }

    #[test]
    fn test_first_visit_reported_once() {
        let cache = IslandCache::new();
        let record = island();
        let id = record.id;
        cache.put(record);
        let player = PlayerId::random();

        assert!(cache.mark_occupant_enter(id, player).unwrap().first_visit);
        assert!(cache.mark_occupant_leave(id, player));
        assert!(!cache.mark_occupant_enter(id, player).unwrap().first_visit);
    }

    #[test]
    fn test_entering_another_island_leaves_the_first() {
        let cache = IslandCache::new();
        let a = island();
        let b = island();
        let (a_id, b_id) = (a.id, b.id);
        cache.put(a);
        cache.put(b);
        let player = PlayerId::random();

        cache.mark_occupant_enter(a_id, player).unwrap();
        let record = cache.mark_occupant_enter(b_id, player).unwrap();

        assert_eq!(record.previous, Some(a_id));
        assert_eq!(cache.occupant_count(a_id), 0);
        assert_eq!(cache.occupants(b_id), vec![player]);
        assert_eq!(cache.located(player), Some(b_id));
    }

    #[test]
    fn test_enter_unloaded_island_is_rejected() {
        let cache = IslandCache::new();
        assert!(
            cache
                .mark_occupant_enter(IslandId::random(), PlayerId::random())
                .is_none()
        );
    }
}
