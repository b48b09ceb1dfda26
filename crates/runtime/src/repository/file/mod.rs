//! File-backed record repositories.
//!
//! # Directory layout
//!
//! ```text
//! <base>/islands/island_{id}.bin        bincode island record
//! <base>/owners/owner_{player}.json     owner -> island id index
//! <base>/memberships/island_{id}.json   memberships of one island
//! <base>/statistics/island_{id}.json    statistics of one island
//! <base>/invitations/island_{id}.json   pending invitations of one island
//! <base>/progress/island_{id}.json      challenge progress of one island
//! <base>/challenges/{challenge}.json    challenge definitions
//! ```
//!
//! Every write goes to a temp file first and is renamed into place, so a
//! crash never leaves a half-written record behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeProgress, Invitation, Island, IslandId,
    IslandStatistics, Membership, PlayerId, ProgressKey,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::repository::{
    ChallengeRepository, InvitationRepository, IslandRepository, MembershipRepository,
    ProgressRepository, RepositoryError, Result, StatisticsRepository,
};

const ISLANDS: &str = "islands";
const OWNERS: &str = "owners";
const MEMBERS: &str = "memberships";
const STATS: &str = "statistics";
const INVITES: &str = "invitations";
const PROGRESS: &str = "progress";
const CHALLENGES: &str = "challenges";

/// File-based implementation of every record repository.
pub struct FileRecords {
    base_dir: PathBuf,
    /// Serializes read-modify-write cycles on the per-island JSON lists.
    write_lock: Mutex<()>,
}

impl FileRecords {
    /// Open (or create) a record directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        for dir in [ISLANDS, OWNERS, MEMBERS, STATS, INVITES, PROGRESS, CHALLENGES] {
            fs::create_dir_all(base_dir.join(dir))?;
        }
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn island_path(&self, id: IslandId) -> PathBuf {
        self.base_dir
            .join(ISLANDS)
            .join(format!("island_{}.bin", id.simple()))
    }

    fn owner_path(&self, owner: PlayerId) -> PathBuf {
        self.base_dir
            .join(OWNERS)
            .join(format!("owner_{}.json", owner.simple()))
    }

    fn list_path(&self, kind: &str, island: IslandId) -> PathBuf {
        self.base_dir
            .join(kind)
            .join(format!("island_{}.json", island.simple()))
    }

    fn challenge_path(&self, id: &ChallengeId) -> PathBuf {
        self.base_dir
            .join(CHALLENGES)
            .join(format!("{}.json", id.as_str()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)
    }

    /// Load a per-island list, returning an empty list when the file is missing.
    fn read_list<T: DeserializeOwned>(&self, kind: &str, island: IslandId) -> Result<Vec<T>> {
        Ok(read_json(&self.list_path(kind, island))?.unwrap_or_default())
    }

    /// Replace a per-island list; an empty list removes the file.
    fn write_list<T: Serialize>(&self, kind: &str, island: IslandId, items: &[T]) -> Result<()> {
        let path = self.list_path(kind, island);
        if items.is_empty() {
            return remove_if_exists(&path);
        }
        write_json(&path, &items)
    }

    /// Every list of `kind` on disk, across all islands.
    fn read_all_lists<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for entry in fs::read_dir(self.base_dir.join(kind))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(list) = read_json::<Vec<T>>(&path)? {
                items.extend(list);
            }
        }
        Ok(items)
    }
}

// ============================================================================
// File helpers
// ============================================================================

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(value).map_err(|e| RepositoryError::Json(e.to_string()))?;
    write_atomic(path, &json)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| RepositoryError::Json(format!("{}: {}", path.display(), e)))?;
    Ok(Some(value))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

// ============================================================================
// Repository implementations
// ============================================================================

impl IslandRepository for FileRecords {
    fn save_island(&self, island: &Island) -> Result<()> {
        let bytes = bincode::serialize(island)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let _guard = self.lock()?;
        write_atomic(&self.island_path(island.id), &bytes)?;
        write_json(&self.owner_path(island.owner), &island.id)?;

        tracing::debug!("Saved island {} ({})", island.id, island.name);
        Ok(())
    }

    fn load_island(&self, id: IslandId) -> Result<Option<Island>> {
        let path = self.island_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let island: Island = bincode::deserialize(&bytes)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if island.id != id {
            return Err(RepositoryError::CorruptedData(format!(
                "{} holds island {}",
                path.display(),
                island.id
            )));
        }
        Ok(Some(island))
    }

    fn load_island_by_owner(&self, owner: PlayerId) -> Result<Option<Island>> {
        let Some(id) = read_json::<IslandId>(&self.owner_path(owner))? else {
            return Ok(None);
        };
        // A stale index entry (island deleted, index left behind) reads as absent.
        Ok(self
            .load_island(id)?
            .filter(|island| island.owner == owner))
    }

    fn delete_island(&self, id: IslandId) -> Result<()> {
        let _guard = self.lock()?;
        if let Some(island) = self.load_island(id)? {
            remove_if_exists(&self.owner_path(island.owner))?;
        }
        remove_if_exists(&self.island_path(id))?;
        tracing::debug!("Deleted island {}", id);
        Ok(())
    }

    fn list_island_ids(&self) -> Result<Vec<IslandId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.base_dir.join(ISLANDS))? {
            let path = entry?.path();
            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(raw) = filename
                    .strip_prefix("island_")
                    .and_then(|s| s.strip_suffix(".bin"))
                && let Ok(uuid) = Uuid::parse_str(raw)
            {
                ids.push(IslandId(uuid));
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

impl MembershipRepository for FileRecords {
    fn save_membership(&self, membership: &Membership) -> Result<()> {
        let _guard = self.lock()?;
        let mut members: Vec<Membership> = self.read_list(MEMBERS, membership.island_id)?;
        match members
            .iter_mut()
            .find(|m| m.player_id == membership.player_id)
        {
            Some(existing) => *existing = membership.clone(),
            None => members.push(membership.clone()),
        }
        self.write_list(MEMBERS, membership.island_id, &members)
    }

    fn load_membership(&self, island: IslandId, player: PlayerId) -> Result<Option<Membership>> {
        Ok(self
            .read_list::<Membership>(MEMBERS, island)?
            .into_iter()
            .find(|m| m.player_id == player))
    }

    fn memberships_of_island(&self, island: IslandId) -> Result<Vec<Membership>> {
        self.read_list(MEMBERS, island)
    }

    fn memberships_of_player(&self, player: PlayerId) -> Result<Vec<Membership>> {
        Ok(self
            .read_all_lists::<Membership>(MEMBERS)?
            .into_iter()
            .filter(|m| m.player_id == player)
            .collect())
    }

    fn delete_membership(&self, island: IslandId, player: PlayerId) -> Result<()> {
        let _guard = self.lock()?;
        let mut members: Vec<Membership> = self.read_list(MEMBERS, island)?;
        members.retain(|m| m.player_id != player);
        self.write_list(MEMBERS, island, &members)
    }

    fn delete_memberships(&self, island: IslandId) -> Result<usize> {
        let _guard = self.lock()?;
        let count = self.read_list::<Membership>(MEMBERS, island)?.len();
        remove_if_exists(&self.list_path(MEMBERS, island))?;
        Ok(count)
    }
}

impl StatisticsRepository for FileRecords {
    fn save_statistics(&self, stats: &IslandStatistics) -> Result<()> {
        write_json(&self.list_path(STATS, stats.island_id), stats)
    }

    fn load_statistics(&self, island: IslandId) -> Result<Option<IslandStatistics>> {
        read_json(&self.list_path(STATS, island))
    }

    fn delete_statistics(&self, island: IslandId) -> Result<()> {
        remove_if_exists(&self.list_path(STATS, island))
    }
}

impl InvitationRepository for FileRecords {
    fn save_invitation(&self, invitation: &Invitation) -> Result<()> {
        let _guard = self.lock()?;
        let mut invites: Vec<Invitation> = self.read_list(INVITES, invitation.island_id)?;
        invites.retain(|inv| inv.invited != invitation.invited);
        invites.push(invitation.clone());
        self.write_list(INVITES, invitation.island_id, &invites)
    }

    fn load_invitation(&self, island: IslandId, invited: PlayerId) -> Result<Option<Invitation>> {
        Ok(self
            .read_list::<Invitation>(INVITES, island)?
            .into_iter()
            .find(|inv| inv.invited == invited))
    }

    fn invitations_for_player(&self, invited: PlayerId) -> Result<Vec<Invitation>> {
        Ok(self
            .read_all_lists::<Invitation>(INVITES)?
            .into_iter()
            .filter(|inv| inv.invited == invited)
            .collect())
    }

    fn delete_invitation(&self, island: IslandId, invited: PlayerId) -> Result<()> {
        let _guard = self.lock()?;
        let mut invites: Vec<Invitation> = self.read_list(INVITES, island)?;
        invites.retain(|inv| inv.invited != invited);
        self.write_list(INVITES, island, &invites)
    }

    fn delete_invitations(&self, island: IslandId) -> Result<usize> {
        let _guard = self.lock()?;
        let count = self.read_list::<Invitation>(INVITES, island)?.len();
        remove_if_exists(&self.list_path(INVITES, island))?;
        Ok(count)
    }

    fn delete_expired_invitations(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock()?;
        let mut removed = 0;
        for entry in fs::read_dir(self.base_dir.join(INVITES))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(mut invites) = read_json::<Vec<Invitation>>(&path)? else {
                continue;
            };
            let before = invites.len();
            invites.retain(|inv| !inv.is_expired(now));
            if invites.len() == before {
                continue;
            }
            removed += before - invites.len();
            if invites.is_empty() {
                remove_if_exists(&path)?;
            } else {
                write_json(&path, &invites)?;
            }
        }
        Ok(removed)
    }
}

impl ChallengeRepository for FileRecords {
    fn save_challenge(&self, definition: &ChallengeDefinition) -> Result<()> {
        write_json(&self.challenge_path(&definition.id), definition)
    }

    fn load_challenge(&self, id: &ChallengeId) -> Result<Option<ChallengeDefinition>> {
        read_json(&self.challenge_path(id))
    }

    fn list_challenges(&self) -> Result<Vec<ChallengeDefinition>> {
        let mut definitions = Vec::new();
        for entry in fs::read_dir(self.base_dir.join(CHALLENGES))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(definition) = read_json::<ChallengeDefinition>(&path)? {
                definitions.push(definition);
            }
        }
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(definitions)
    }
}

impl ProgressRepository for FileRecords {
    fn save_progress(&self, progress: &ChallengeProgress) -> Result<()> {
        let _guard = self.lock()?;
        let island = progress.key.island;
        let mut records: Vec<ChallengeProgress> = self.read_list(PROGRESS, island)?;
        match records.iter_mut().find(|p| p.key == progress.key) {
            Some(existing) => *existing = progress.clone(),
            None => records.push(progress.clone()),
        }
        self.write_list(PROGRESS, island, &records)
    }

    fn load_progress(&self, key: &ProgressKey) -> Result<Option<ChallengeProgress>> {
        Ok(self
            .read_list::<ChallengeProgress>(PROGRESS, key.island)?
            .into_iter()
            .find(|p| &p.key == key))
    }

    fn progress_of_island(&self, island: IslandId) -> Result<Vec<ChallengeProgress>> {
        self.read_list(PROGRESS, island)
    }

    fn delete_progress(&self, island: IslandId) -> Result<usize> {
        let _guard = self.lock()?;
        let count = self.read_list::<ChallengeProgress>(PROGRESS, island)?.len();
        remove_if_exists(&self.list_path(PROGRESS, island))?;
        Ok(count)
    }
}
