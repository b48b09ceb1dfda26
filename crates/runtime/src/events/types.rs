//! Event types for different topics.

use island_core::{ChallengeId, IslandId, IslandType, PlayerId, UpgradeKind};
use serde::{Deserialize, Serialize};

use crate::api::TeleportKind;

/// Island lifecycle transitions and visits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Created {
        island: IslandId,
        owner: PlayerId,
        kind: IslandType,
    },

    /// Brought into the cache from the store.
    Loaded { island: IslandId, reprovisioned: bool },

    Visited {
        island: IslandId,
        player: PlayerId,
        first_visit: bool,
        cross_realm: bool,
    },

    Left { island: IslandId, player: PlayerId },

    /// Removed from the cache after sitting idle; still in the store.
    Evicted { island: IslandId },

    Deleted { island: IslandId, owner: PlayerId },
}

impl LifecycleEvent {
    pub(crate) fn visited(
        island: IslandId,
        player: PlayerId,
        first_visit: bool,
        kind: TeleportKind,
    ) -> Self {
        Self::Visited {
            island,
            player,
            first_visit,
            cross_realm: kind.is_cross_realm(),
        }
    }
}

/// Challenge progress, completions and upgrades
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    ProgressAdvanced {
        island: IslandId,
        player: Option<PlayerId>,
        challenge: ChallengeId,
        current: u64,
        target: u64,
    },

    ChallengeCompleted {
        island: IslandId,
        player: Option<PlayerId>,
        challenge: ChallengeId,
        reward: u64,
    },

    Upgraded {
        island: IslandId,
        kind: UpgradeKind,
        level: u32,
        units: u64,
        tokens: u64,
    },
}
