//! In-memory record repositories for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeProgress, Invitation, Island, IslandId,
    IslandStatistics, Membership, PlayerId, ProgressKey,
};

use crate::repository::{
    ChallengeRepository, InvitationRepository, IslandRepository, MembershipRepository,
    ProgressRepository, RepositoryError, Result, StatisticsRepository,
};

/// In-memory implementation of every record repository.
///
/// Writes can be made to fail on demand with [`InMemoryRecords::set_write_failure`],
/// which lets callers exercise their storage-failure paths without a real disk.
#[derive(Default)]
pub struct InMemoryRecords {
    islands: RwLock<HashMap<IslandId, Island>>,
    memberships: RwLock<HashMap<(IslandId, PlayerId), Membership>>,
    statistics: RwLock<HashMap<IslandId, IslandStatistics>>,
    invitations: RwLock<HashMap<(IslandId, PlayerId), Invitation>>,
    challenges: RwLock<HashMap<ChallengeId, ChallengeDefinition>>,
    progress: RwLock<HashMap<ProgressKey, ChallengeProgress>>,
    fail_writes: AtomicBool,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every save and delete returns [`RepositoryError::WriteRejected`].
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self, what: &'static str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::WriteRejected(what))
        } else {
            Ok(())
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| RepositoryError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| RepositoryError::LockPoisoned)
}

impl IslandRepository for InMemoryRecords {
    fn save_island(&self, island: &Island) -> Result<()> {
        self.check_write("island")?;
        write(&self.islands)?.insert(island.id, island.clone());
        Ok(())
    }

    fn load_island(&self, id: IslandId) -> Result<Option<Island>> {
        Ok(read(&self.islands)?.get(&id).cloned())
    }

    fn load_island_by_owner(&self, owner: PlayerId) -> Result<Option<Island>> {
        Ok(read(&self.islands)?
            .values()
            .find(|island| island.owner == owner)
            .cloned())
    }

    fn delete_island(&self, id: IslandId) -> Result<()> {
        self.check_write("island")?;
        write(&self.islands)?.remove(&id);
        Ok(())
    }

    fn list_island_ids(&self) -> Result<Vec<IslandId>> {
        let mut ids: Vec<IslandId> = read(&self.islands)?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

impl MembershipRepository for InMemoryRecords {
    fn save_membership(&self, membership: &Membership) -> Result<()> {
        self.check_write("membership")?;
        write(&self.memberships)?.insert(
            (membership.island_id, membership.player_id),
            membership.clone(),
        );
        Ok(())
    }

    fn load_membership(&self, island: IslandId, player: PlayerId) -> Result<Option<Membership>> {
        Ok(read(&self.memberships)?.get(&(island, player)).cloned())
    }

    fn memberships_of_island(&self, island: IslandId) -> Result<Vec<Membership>> {
        let mut members: Vec<Membership> = read(&self.memberships)?
            .values()
            .filter(|m| m.island_id == island)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.added_at, m.player_id));
        Ok(members)
    }

    fn memberships_of_player(&self, player: PlayerId) -> Result<Vec<Membership>> {
        Ok(read(&self.memberships)?
            .values()
            .filter(|m| m.player_id == player)
            .cloned()
            .collect())
    }

    fn delete_membership(&self, island: IslandId, player: PlayerId) -> Result<()> {
        self.check_write("membership")?;
        write(&self.memberships)?.remove(&(island, player));
        Ok(())
    }

    fn delete_memberships(&self, island: IslandId) -> Result<usize> {
        self.check_write("membership")?;
        let mut memberships = write(&self.memberships)?;
        let before = memberships.len();
        memberships.retain(|(id, _), _| *id != island);
        Ok(before - memberships.len())
    }
}

impl StatisticsRepository for InMemoryRecords {
    fn save_statistics(&self, stats: &IslandStatistics) -> Result<()> {
        self.check_write("statistics")?;
        write(&self.statistics)?.insert(stats.island_id, stats.clone());
        Ok(())
    }

    fn load_statistics(&self, island: IslandId) -> Result<Option<IslandStatistics>> {
        Ok(read(&self.statistics)?.get(&island).cloned())
    }

    fn delete_statistics(&self, island: IslandId) -> Result<()> {
        self.check_write("statistics")?;
        write(&self.statistics)?.remove(&island);
        Ok(())
    }
}

impl InvitationRepository for InMemoryRecords {
    fn save_invitation(&self, invitation: &Invitation) -> Result<()> {
        self.check_write("invitation")?;
        write(&self.invitations)?.insert(
            (invitation.island_id, invitation.invited),
            invitation.clone(),
        );
        Ok(())
    }

    fn load_invitation(&self, island: IslandId, invited: PlayerId) -> Result<Option<Invitation>> {
        Ok(read(&self.invitations)?.get(&(island, invited)).cloned())
    }

    fn invitations_for_player(&self, invited: PlayerId) -> Result<Vec<Invitation>> {
        Ok(read(&self.invitations)?
            .values()
            .filter(|inv| inv.invited == invited)
            .cloned()
            .collect())
    }

    fn delete_invitation(&self, island: IslandId, invited: PlayerId) -> Result<()> {
        self.check_write("invitation")?;
        write(&self.invitations)?.remove(&(island, invited));
        Ok(())
    }

    fn delete_invitations(&self, island: IslandId) -> Result<usize> {
        self.check_write("invitation")?;
        let mut invitations = write(&self.invitations)?;
        let before = invitations.len();
        invitations.retain(|(id, _), _| *id != island);
        Ok(before - invitations.len())
    }

    fn delete_expired_invitations(&self, now: DateTime<Utc>) -> Result<usize> {
        self.check_write("invitation")?;
        let mut invitations = write(&self.invitations)?;
        let before = invitations.len();
        invitations.retain(|_, inv| !inv.is_expired(now));
        Ok(before - invitations.len())
    }
}

impl ChallengeRepository for InMemoryRecords {
    fn save_challenge(&self, definition: &ChallengeDefinition) -> Result<()> {
        self.check_write("challenge")?;
        write(&self.challenges)?.insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    fn load_challenge(&self, id: &ChallengeId) -> Result<Option<ChallengeDefinition>> {
        Ok(read(&self.challenges)?.get(id).cloned())
    }

    fn list_challenges(&self) -> Result<Vec<ChallengeDefinition>> {
        let mut definitions: Vec<ChallengeDefinition> =
            read(&self.challenges)?.values().cloned().collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(definitions)
    }
}

impl ProgressRepository for InMemoryRecords {
    fn save_progress(&self, progress: &ChallengeProgress) -> Result<()> {
        self.check_write("progress")?;
        write(&self.progress)?.insert(progress.key.clone(), progress.clone());
        Ok(())
    }

    fn load_progress(&self, key: &ProgressKey) -> Result<Option<ChallengeProgress>> {
        Ok(read(&self.progress)?.get(key).cloned())
    }

    fn progress_of_island(&self, island: IslandId) -> Result<Vec<ChallengeProgress>> {
        let mut records: Vec<ChallengeProgress> = read(&self.progress)?
            .values()
            .filter(|p| p.key.island == island)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    fn delete_progress(&self, island: IslandId) -> Result<usize> {
        self.check_write("progress")?;
        let mut progress = write(&self.progress)?;
        let before = progress.len();
        progress.retain(|key, _| key.island != island);
        Ok(before - progress.len())
    }
}
