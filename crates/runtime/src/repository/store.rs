//! Async façade over the record repositories.
//!
//! Repository calls are synchronous and may touch the disk, so every call is
//! moved onto the blocking pool. Failures are logged here, once, with the
//! entity and key, and surface to callers only as [`StorageFailure`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use island_core::{
    ChallengeDefinition, ChallengeProgress, ChallengeRegistry, Invitation, Island,
    IslandId, IslandStatistics, Membership, PlayerId, ProgressKey,
};
use tracing::{debug, error};

use crate::repository::{InMemoryRecords, Records, RepositoryError};

/// Opaque marker for a failed store call. Details are already logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageFailure;

impl fmt::Display for StorageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("record store failure")
    }
}

impl std::error::Error for StorageFailure {}

pub type StoreResult<T> = std::result::Result<T, StorageFailure>;

/// Durable CRUD for every record kind, without business rules.
#[derive(Clone)]
pub struct RecordStore {
    records: Arc<dyn Records>,
}

impl RecordStore {
    pub fn new(records: Arc<dyn Records>) -> Self {
        Self { records }
    }

    /// Store backed by fresh [`InMemoryRecords`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRecords::new()))
    }

    /// Runs `op` on the blocking pool and applies the log-and-mark policy.
    async fn run<T, F>(&self, entity: &'static str, key: String, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Records) -> Result<T, RepositoryError> + Send + 'static,
    {
        let records = Arc::clone(&self.records);
        let joined = tokio::task::spawn_blocking(move || op(records.as_ref())).await;

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Record store failure on {} [{}]: {}", entity, key, e);
                Err(StorageFailure)
            }
            Err(e) => {
                error!("Record store task for {} [{}] failed: {}", entity, key, e);
                Err(StorageFailure)
            }
        }
    }

    // ========================================================================
    // Islands
    // ========================================================================

    pub async fn save_island(&self, island: &Island) -> StoreResult<()> {
        let island = island.clone();
        self.run("island", island.id.to_string(), move |r| {
            r.save_island(&island)
        })
        .await
    }

    pub async fn load_island(&self, id: IslandId) -> StoreResult<Option<Island>> {
        self.run("island", id.to_string(), move |r| r.load_island(id))
            .await
    }

    pub async fn load_island_by_owner(&self, owner: PlayerId) -> StoreResult<Option<Island>> {
        self.run("island owner", owner.to_string(), move |r| {
            r.load_island_by_owner(owner)
        })
        .await
    }

    pub async fn delete_island(&self, id: IslandId) -> StoreResult<()> {
        self.run("island", id.to_string(), move |r| r.delete_island(id))
            .await
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    pub async fn save_membership(&self, membership: &Membership) -> StoreResult<()> {
        let membership = membership.clone();
        let key = format!("{}/{}", membership.island_id, membership.player_id);
        self.run("membership", key, move |r| r.save_membership(&membership))
            .await
    }

    pub async fn load_membership(
        &self,
        island: IslandId,
        player: PlayerId,
    ) -> StoreResult<Option<Membership>> {
        self.run("membership", format!("{}/{}", island, player), move |r| {
            r.load_membership(island, player)
        })
        .await
    }

    pub async fn memberships_of_island(&self, island: IslandId) -> StoreResult<Vec<Membership>> {
        self.run("membership", island.to_string(), move |r| {
            r.memberships_of_island(island)
        })
        .await
    }

    pub async fn memberships_of_player(&self, player: PlayerId) -> StoreResult<Vec<Membership>> {
        self.run("membership", player.to_string(), move |r| {
            r.memberships_of_player(player)
        })
        .await
    }

    pub async fn delete_membership(&self, island: IslandId, player: PlayerId) -> StoreResult<()> {
        self.run("membership", format!("{}/{}", island, player), move |r| {
            r.delete_membership(island, player)
        })
        .await
    }

    pub async fn delete_memberships(&self, island: IslandId) -> StoreResult<usize> {
        self.run("membership", island.to_string(), move |r| {
            r.delete_memberships(island)
        })
        .await
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub async fn save_statistics(&self, stats: &IslandStatistics) -> StoreResult<()> {
        let stats = stats.clone();
        self.run("statistics", stats.island_id.to_string(), move |r| {
            r.save_statistics(&stats)
        })
        .await
    }

    pub async fn load_statistics(&self, island: IslandId) -> StoreResult<Option<IslandStatistics>> {
        self.run("statistics", island.to_string(), move |r| {
            r.load_statistics(island)
        })
        .await
    }

    pub async fn delete_statistics(&self, island: IslandId) -> StoreResult<()> {
        self.run("statistics", island.to_string(), move |r| {
            r.delete_statistics(island)
        })
        .await
    }

    // ========================================================================
    // Invitations
    // ========================================================================

    pub async fn save_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let invitation = invitation.clone();
        let key = format!("{}/{}", invitation.island_id, invitation.invited);
        self.run("invitation", key, move |r| r.save_invitation(&invitation))
            .await
    }

    pub async fn load_invitation(
        &self,
        island: IslandId,
        invited: PlayerId,
    ) -> StoreResult<Option<Invitation>> {
        self.run("invitation", format!("{}/{}", island, invited), move |r| {
            r.load_invitation(island, invited)
        })
        .await
    }

    pub async fn invitations_for_player(&self, invited: PlayerId) -> StoreResult<Vec<Invitation>> {
        self.run("invitation", invited.to_string(), move |r| {
            r.invitations_for_player(invited)
        })
        .await
    }

    pub async fn delete_invitation(&self, island: IslandId, invited: PlayerId) -> StoreResult<()> {
        self.run("invitation", format!("{}/{}", island, invited), move |r| {
            r.delete_invitation(island, invited)
        })
        .await
    }

    pub async fn delete_invitations(&self, island: IslandId) -> StoreResult<usize> {
        self.run("invitation", island.to_string(), move |r| {
            r.delete_invitations(island)
        })
        .await
    }

    /// Prunes invitations that expired at or before `now`.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let removed = self
            .run("invitation", "expired".into(), move |r| {
                r.delete_expired_invitations(now)
            })
            .await?;
        if removed > 0 {
            debug!("Pruned {} expired invitations", removed);
        }
        Ok(removed)
    }

    // ========================================================================
    // Challenges and progress
    // ========================================================================

    pub async fn save_challenge(&self, definition: &ChallengeDefinition) -> StoreResult<()> {
        let definition = definition.clone();
        self.run("challenge", definition.id.to_string(), move |r| {
            r.save_challenge(&definition)
        })
        .await
    }

    pub async fn list_challenges(&self) -> StoreResult<Vec<ChallengeDefinition>> {
        self.run("challenge", "*".into(), |r| r.list_challenges())
            .await
    }

    /// Writes every registered definition, replacing stale copies.
    pub async fn sync_challenges(&self, registry: &ChallengeRegistry) -> StoreResult<usize> {
        let definitions: Vec<ChallengeDefinition> = registry.iter().cloned().collect();
        self.run("challenge", "registry".into(), move |r| {
            for definition in &definitions {
                r.save_challenge(definition)?;
            }
            Ok(definitions.len())
        })
        .await
    }

    pub async fn save_progress(&self, progress: &ChallengeProgress) -> StoreResult<()> {
        let progress = progress.clone();
        let key = progress_label(&progress.key);
        self.run("progress", key, move |r| r.save_progress(&progress))
            .await
    }

    pub async fn load_progress(&self, key: &ProgressKey) -> StoreResult<Option<ChallengeProgress>> {
        let key = key.clone();
        self.run("progress", progress_label(&key), move |r| {
            r.load_progress(&key)
        })
        .await
    }

    pub async fn delete_progress(&self, island: IslandId) -> StoreResult<usize> {
        self.run("progress", island.to_string(), move |r| {
            r.delete_progress(island)
        })
        .await
    }
}

fn progress_label(key: &ProgressKey) -> String {
    match key.player {
        Some(player) => format!("{}/{}/{}", key.challenge, key.island, player),
        None => format!("{}/{}", key.challenge, key.island),
    }
}
