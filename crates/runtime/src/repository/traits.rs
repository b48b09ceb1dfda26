//! Repository contracts for saving and loading island records.
//!
//! Every `save_*` is an upsert keyed by the record's natural key, so
//! repeating a write is harmless. Deletes of absent records succeed.

use chrono::{DateTime, Utc};
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeProgress, Invitation, Island, IslandId,
    IslandStatistics, Membership, PlayerId, ProgressKey,
};

use super::Result;

/// Repository for island records (one per owner).
pub trait IslandRepository: Send + Sync {
    /// Upsert an island by id
    fn save_island(&self, island: &Island) -> Result<()>;

    fn load_island(&self, id: IslandId) -> Result<Option<Island>>;

    /// Load the island owned by `owner`
    fn load_island_by_owner(&self, owner: PlayerId) -> Result<Option<Island>>;

    fn delete_island(&self, id: IslandId) -> Result<()>;

    /// List all stored island ids
    fn list_island_ids(&self) -> Result<Vec<IslandId>>;
}

/// Repository for memberships, unique per `(island, player)`.
pub trait MembershipRepository: Send + Sync {
    fn save_membership(&self, membership: &Membership) -> Result<()>;

    fn load_membership(&self, island: IslandId, player: PlayerId) -> Result<Option<Membership>>;

    fn memberships_of_island(&self, island: IslandId) -> Result<Vec<Membership>>;

    fn memberships_of_player(&self, player: PlayerId) -> Result<Vec<Membership>>;

    fn delete_membership(&self, island: IslandId, player: PlayerId) -> Result<()>;

    /// Delete every membership of an island, returning how many were removed
    fn delete_memberships(&self, island: IslandId) -> Result<usize>;
}

/// Repository for per-island statistics (1:1 with islands).
pub trait StatisticsRepository: Send + Sync {
    fn save_statistics(&self, stats: &IslandStatistics) -> Result<()>;

    fn load_statistics(&self, island: IslandId) -> Result<Option<IslandStatistics>>;

    fn delete_statistics(&self, island: IslandId) -> Result<()>;
}

/// Repository for transient invitations, unique per `(island, invited)`.
pub trait InvitationRepository: Send + Sync {
    fn save_invitation(&self, invitation: &Invitation) -> Result<()>;

    fn load_invitation(&self, island: IslandId, invited: PlayerId) -> Result<Option<Invitation>>;

    fn invitations_for_player(&self, invited: PlayerId) -> Result<Vec<Invitation>>;

    fn delete_invitation(&self, island: IslandId, invited: PlayerId) -> Result<()>;

    fn delete_invitations(&self, island: IslandId) -> Result<usize>;

    /// Prune invitations expired at `now`, returning how many were removed
    fn delete_expired_invitations(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Repository for challenge definitions (written once at startup).
pub trait ChallengeRepository: Send + Sync {
    fn save_challenge(&self, definition: &ChallengeDefinition) -> Result<()>;

    fn load_challenge(&self, id: &ChallengeId) -> Result<Option<ChallengeDefinition>>;

    fn list_challenges(&self) -> Result<Vec<ChallengeDefinition>>;
}

/// Repository for challenge progress, unique per [`ProgressKey`].
pub trait ProgressRepository: Send + Sync {
    fn save_progress(&self, progress: &ChallengeProgress) -> Result<()>;

    fn load_progress(&self, key: &ProgressKey) -> Result<Option<ChallengeProgress>>;

    fn progress_of_island(&self, island: IslandId) -> Result<Vec<ChallengeProgress>>;

    fn delete_progress(&self, island: IslandId) -> Result<usize>;
}

/// Every record kind behind one object, as held by [`super::RecordStore`].
pub trait Records:
    IslandRepository
    + MembershipRepository
    + StatisticsRepository
    + InvitationRepository
    + ChallengeRepository
    + ProgressRepository
{
}

impl<T> Records for T where
    T: IslandRepository
        + MembershipRepository
        + StatisticsRepository
        + InvitationRepository
        + ChallengeRepository
        + ProgressRepository
{
}
