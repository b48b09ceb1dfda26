//! Island membership and invitations.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ids::{IslandId, PlayerId};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// Exactly one per island; always the island's owner.
    Owner,
    Member,
}

/// A player's standing on an island. Unique per `(island_id, player_id)`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Membership {
    pub island_id: IslandId,
    pub player_id: PlayerId,
    pub role: Role,
    pub added_at: DateTime<Utc>,
    pub last_visit: Option<DateTime<Utc>>,
}

impl Membership {
    pub fn owner(island_id: IslandId, player_id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            island_id,
            player_id,
            role: Role::Owner,
            added_at: now,
            last_visit: None,
        }
    }

    pub fn member(island_id: IslandId, player_id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            role: Role::Member,
            ..Self::owner(island_id, player_id, now)
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// Pending request for `invited` to join `island_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Invitation {
    pub island_id: IslandId,
    pub invited: PlayerId,
    pub inviter: PlayerId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(
        island_id: IslandId,
        invited: PlayerId,
        inviter: PlayerId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        Self {
            island_id,
            invited,
            inviter,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_keeps_keys() {
        let island = IslandId::random();
        let player = PlayerId::random();
        let now = Utc::now();

        let member = Membership::member(island, player, now);
        assert_eq!(member.island_id, island);
        assert_eq!(member.player_id, player);
        assert!(!member.is_owner());
        assert!(Membership::owner(island, player, now).is_owner());
    }

    #[test]
    fn test_invitation_expiry() {
        let now = Utc::now();
        let invite = Invitation::new(
            IslandId::random(),
            PlayerId::random(),
            PlayerId::random(),
            now,
            Duration::from_secs(60),
        );

        assert!(!invite.is_expired(now + chrono::Duration::seconds(59)));
        assert!(invite.is_expired(now + chrono::Duration::seconds(60)));
    }
}
