//! Realm backend contract.
//!
//! The backend owns the heavyweight spatial world behind each island. The
//! runtime never calls it directly: every call is routed through the realm
//! worker so realm work happens in one ordered mutation context.

use async_trait::async_trait;
use island_core::{Island, IslandId, IslandType, Location, PlayerId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealmError {
    #[error("no realm exists for island {0}")]
    Missing(IslandId),

    #[error("realm backend failed: {0}")]
    Backend(String),
}

/// Everything the backend needs to build an island's realm from scratch.
#[derive(Clone, Debug, PartialEq)]
pub struct RealmSpec {
    pub island_id: IslandId,
    pub realm_name: String,
    pub kind: IslandType,
    pub border_size: u32,
    pub spawn: Location,
}

impl RealmSpec {
    pub fn for_island(island: &Island) -> Self {
        Self {
            island_id: island.id,
            realm_name: island.realm_name.clone(),
            kind: island.kind,
            border_size: island.border_size(),
            spawn: island.spawn,
        }
    }
}

/// A realm the backend has in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealmHandle {
    pub island_id: IslandId,
    pub realm_name: String,
}

/// Where a player is sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub realm_name: String,
    pub location: Location,
}

impl Destination {
    pub fn new(realm_name: impl Into<String>, location: Location) -> Self {
        Self {
            realm_name: realm_name.into(),
            location,
        }
    }

    /// The spawn pose of an island.
    pub fn spawn_of(island: &Island) -> Self {
        Self::new(island.realm_name.clone(), island.spawn)
    }
}

/// Whether a move crosses realms, decided by comparing the player's current
/// realm with the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TeleportKind {
    SameRealm,
    CrossRealm,
}

impl TeleportKind {
    pub fn between(current: Option<&str>, destination: &str) -> Self {
        match current {
            Some(realm) if realm == destination => Self::SameRealm,
            _ => Self::CrossRealm,
        }
    }

    pub fn is_cross_realm(self) -> bool {
        self == Self::CrossRealm
    }
}

/// Backend that provisions and hosts island realms.
///
/// `unload` and `delete` must be idempotent.
#[async_trait]
pub trait RealmBackend: Send + Sync {
    async fn provision(&self, spec: &RealmSpec) -> Result<RealmHandle, RealmError>;

    /// Bring a stored realm into memory; `None` when the backend has no realm
    /// for the island.
    async fn load(&self, island: IslandId) -> Result<Option<RealmHandle>, RealmError>;

    /// Returns whether a realm was actually unloaded.
    async fn unload(&self, island: IslandId) -> Result<bool, RealmError>;

    async fn delete(&self, island: IslandId) -> Result<(), RealmError>;

    async fn set_boundary(&self, island: IslandId, size: u32) -> Result<(), RealmError>;

    /// Boundary applied and the cell at `location` resolved.
    async fn is_ready(&self, island: IslandId, location: &Location) -> bool;

    async fn move_player(
        &self,
        player: PlayerId,
        destination: &Destination,
        kind: TeleportKind,
    ) -> Result<(), RealmError>;

    /// Name of the realm the player is currently in.
    async fn realm_of(&self, player: PlayerId) -> Option<String>;

    /// Where players go when their island disappears under them.
    fn fallback_location(&self) -> Destination;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teleport_kind_between() {
        assert_eq!(
            TeleportKind::between(Some("island_a"), "island_a"),
            TeleportKind::SameRealm
        );
        assert_eq!(
            TeleportKind::between(Some("lobby"), "island_a"),
            TeleportKind::CrossRealm
        );
        assert!(TeleportKind::between(None, "island_a").is_cross_realm());
    }
}
