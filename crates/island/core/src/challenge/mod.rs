//! Challenge definitions and per-island progress.
//!
//! Definitions are immutable once registered; progress records are created
//! lazily and only ever move forward.

mod registry;

pub use registry::{ChallengeRegistry, RegistryError};

use chrono::{DateTime, Utc};

use crate::ids::{ChallengeId, IslandId, PlayerId};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Extreme,
}

/// Who a challenge's progress belongs to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChallengeScope {
    /// Shared by every member of the island.
    #[default]
    Island,
    /// Tracked separately for each player on the island.
    Player,
}

/// Immutable challenge definition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChallengeDefinition {
    pub id: ChallengeId,
    pub name: String,
    pub category: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub difficulty: Difficulty,
    /// Tokens credited to the island on completion.
    pub reward: u64,
    /// Metric key the progress counts (e.g. `"blocks_placed"`).
    pub metric: String,
    pub target: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scope: ChallengeScope,
    #[cfg_attr(feature = "serde", serde(default))]
    pub prerequisites: Vec<ChallengeId>,
}

impl ChallengeDefinition {
    /// Progress key for this challenge; the player is dropped for
    /// island-scoped challenges.
    pub fn key(&self, island: IslandId, player: Option<PlayerId>) -> ProgressKey {
        let player = match self.scope {
            ChallengeScope::Island => None,
            ChallengeScope::Player => player,
        };
        ProgressKey {
            challenge: self.id.clone(),
            island,
            player,
        }
    }
}

/// Unique key of a progress record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressKey {
    pub challenge: ChallengeId,
    pub island: IslandId,
    pub player: Option<PlayerId>,
}

/// Result of advancing a progress record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressStep {
    /// Already complete; nothing changed.
    Unchanged,
    /// Progress grew but the target is not reached.
    Advanced { current: u64 },
    /// This step reached the target.
    Completed { current: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChallengeProgress {
    pub key: ProgressKey,
    pub current: u64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChallengeProgress {
    /// Zero-progress record.
    pub fn new(key: ProgressKey) -> Self {
        Self {
            key,
            current: 0,
            completed: false,
            completed_at: None,
        }
    }

    /// Adds `amount` toward `target`. Completed records are frozen.
    pub fn advance(&mut self, amount: u64, target: u64, now: DateTime<Utc>) -> ProgressStep {
        if self.completed {
            return ProgressStep::Unchanged;
        }

        self.current = self.current.saturating_add(amount);
        if self.current >= target {
            self.completed = true;
            self.completed_at = Some(now);
            ProgressStep::Completed {
                current: self.current,
            }
        } else {
            ProgressStep::Advanced {
                current: self.current,
            }
        }
    }
}
