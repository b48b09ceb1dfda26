//! Live statistics for loaded islands.
//!
//! Counters accumulate in memory while an island is cached and are written to
//! the store when it is evicted, when the runtime shuts down, or on demand.

use dashmap::DashMap;
use island_core::{InteractionKind, IslandId, IslandStatistics};

#[derive(Default)]
pub struct StatisticsTracker {
    live: DashMap<IslandId, IslandStatistics>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking an island from its stored counters. A record that is
    /// already live wins.
    pub fn attach(&self, stats: IslandStatistics) {
        self.live.entry(stats.island_id).or_insert(stats);
    }

    pub fn is_tracked(&self, island: IslandId) -> bool {
        self.live.contains_key(&island)
    }

    /// Returns false when the island is not tracked.
    pub fn record_visit(&self, island: IslandId, first_visit: bool) -> bool {
        self.update(island, |stats| stats.record_visit(first_visit))
    }

    pub fn record_interaction(&self, island: IslandId, kind: InteractionKind, amount: u64) -> bool {
        self.update(island, |stats| stats.record(kind, amount))
    }

    pub fn add_playtime(&self, island: IslandId, secs: u64) -> bool {
        self.update(island, |stats| stats.add_playtime(secs))
    }

    fn update(&self, island: IslandId, f: impl FnOnce(&mut IslandStatistics)) -> bool {
        match self.live.get_mut(&island) {
            Some(mut stats) => {
                f(stats.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, island: IslandId) -> Option<IslandStatistics> {
        self.live.get(&island).map(|stats| stats.clone())
    }

    pub fn forget(&self, island: IslandId) -> Option<IslandStatistics> {
        self.live.remove(&island).map(|(_, stats)| stats)
    }
}
