//! Fire-and-forget player notifications.

use std::fmt;

use island_core::{ChallengeId, IslandId, PlayerId, UpgradeKind};

/// Something a player should be told about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    IslandCreated { island: IslandId },
    IslandDeleted { island: IslandId },
    /// Sent to occupants moved out of an island being deleted.
    MovedToFallback { island: IslandId },
    Invited { island: IslandId, inviter: PlayerId },
    MemberJoined { island: IslandId, player: PlayerId },
    MemberRemoved { island: IslandId, player: PlayerId },
    ChallengeCompleted {
        challenge: ChallengeId,
        name: String,
        reward: u64,
    },
    Upgraded { kind: UpgradeKind, level: u32 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::IslandCreated { .. } => write!(f, "Your island is ready"),
            Notice::IslandDeleted { .. } => write!(f, "The island has been deleted"),
            Notice::MovedToFallback { .. } => {
                write!(f, "The island you were on is gone; you have been moved")
            }
            Notice::Invited { inviter, .. } => {
                write!(f, "Player {} invited you to their island", inviter)
            }
            Notice::MemberJoined { player, .. } => write!(f, "Player {} joined the island", player),
            Notice::MemberRemoved { player, .. } => {
                write!(f, "Player {} was removed from the island", player)
            }
            Notice::ChallengeCompleted { name, reward, .. } => {
                write!(f, "Challenge '{}' completed, {} tokens awarded", name, reward)
            }
            Notice::Upgraded { kind, level } => write!(f, "{} upgraded to level {}", kind, level),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, recipients: &[PlayerId], notice: &Notice);
}

/// Notifier that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _recipients: &[PlayerId], _notice: &Notice) {}
}
