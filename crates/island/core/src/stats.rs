//! Per-island statistics (1:1 with an island).

use crate::ids::IslandId;

/// World interactions counted per island.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InteractionKind {
    BlocksPlaced,
    BlocksBroken,
    EntitiesKilled,
    CropsHarvested,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IslandStatistics {
    pub island_id: IslandId,
    pub visits: u64,
    pub unique_visitors: u64,
    pub blocks_placed: u64,
    pub blocks_broken: u64,
    pub entities_killed: u64,
    pub crops_harvested: u64,
    pub playtime_secs: u64,
}

impl IslandStatistics {
    /// Zeroed statistics, created together with the island.
    pub fn new(island_id: IslandId) -> Self {
        Self {
            island_id,
            visits: 0,
            unique_visitors: 0,
            blocks_placed: 0,
            blocks_broken: 0,
            entities_killed: 0,
            crops_harvested: 0,
            playtime_secs: 0,
        }
    }

    pub fn record_visit(&mut self, first_visit: bool) {
        self.visits += 1;
        if first_visit {
            self.unique_visitors += 1;
        }
    }

    pub fn record(&mut self, kind: InteractionKind, amount: u64) {
        let counter = match kind {
            InteractionKind::BlocksPlaced => &mut self.blocks_placed,
            InteractionKind::BlocksBroken => &mut self.blocks_broken,
            InteractionKind::EntitiesKilled => &mut self.entities_killed,
            InteractionKind::CropsHarvested => &mut self.crops_harvested,
        };
        *counter = counter.saturating_add(amount);
    }

    pub fn get(&self, kind: InteractionKind) -> u64 {
        match kind {
            InteractionKind::BlocksPlaced => self.blocks_placed,
            InteractionKind::BlocksBroken => self.blocks_broken,
            InteractionKind::EntitiesKilled => self.entities_killed,
            InteractionKind::CropsHarvested => self.crops_harvested,
        }
    }

    pub fn add_playtime(&mut self, secs: u64) {
        self.playtime_secs = self.playtime_secs.saturating_add(secs);
    }

    pub fn is_zeroed(&self) -> bool {
        *self == Self::new(self.island_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visits() {
        let mut stats = IslandStatistics::new(IslandId::random());
        assert!(stats.is_zeroed());

        stats.record_visit(true);
        stats.record_visit(false);
        assert_eq!(stats.visits, 2);
        assert_eq!(stats.unique_visitors, 1);
    }

    #[test]
    fn test_interactions() {
        let mut stats = IslandStatistics::new(IslandId::random());
        stats.record(InteractionKind::BlocksPlaced, 3);
        stats.record(InteractionKind::BlocksPlaced, 2);
        stats.record(InteractionKind::CropsHarvested, u64::MAX);
        stats.record(InteractionKind::CropsHarvested, 1);

        assert_eq!(stats.get(InteractionKind::BlocksPlaced), 5);
        assert_eq!(stats.get(InteractionKind::CropsHarvested), u64::MAX);
        assert_eq!(stats.get(InteractionKind::BlocksBroken), 0);
    }
}
