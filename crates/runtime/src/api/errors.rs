//! Error types surfaced by the runtime API.
//!
//! [`IslandError`] is what every island operation returns. [`RuntimeError`]
//! covers assembling and shutting down the runtime itself.

use island_core::{ChallengeId, UpgradeKind};
use thiserror::Error;

use super::realm::RealmError;
use super::wallet::WalletError;
use crate::repository::StorageFailure;

pub type Result<T> = std::result::Result<T, IslandError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IslandError {
    #[error("island not found")]
    NotFound,

    #[error("challenge {0} not found")]
    ChallengeNotFound(ChallengeId),

    #[error("player already owns an island")]
    AlreadyExists,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("insufficient units: need {needed}, have {available}")]
    InsufficientUnits { needed: u64, available: u64 },

    #[error("insufficient tokens: need {needed}, have {available}")]
    InsufficientTokens { needed: u64, available: u64 },

    #[error("{0} is already at its maximum level")]
    MaxLevelReached(UpgradeKind),

    #[error("island is full ({limit} players)")]
    Full { limit: usize },

    #[error("island realm did not become ready in time")]
    RealmNotReady,

    #[error("island records could not be read or written")]
    StorageFailure,

    #[error("island is closed to visitors")]
    VisitorsDisallowed,

    #[error("only the island owner can do that")]
    NotOwner,

    #[error("player is already a member of this island")]
    AlreadyMember,

    #[error("island has reached its member limit of {limit}")]
    MemberLimit { limit: usize },

    #[error("no pending invitation for this island")]
    InvitationMissing,

    #[error("the island owner cannot be removed")]
    CannotRemoveOwner,

    #[error("location is outside the island boundary")]
    OutsideBoundary,

    #[error(transparent)]
    Realm(#[from] RealmError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("runtime worker is not running")]
    WorkerUnavailable,
}

impl IslandError {
    /// Transient failures worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RealmNotReady | Self::WorkerUnavailable)
    }
}

impl From<StorageFailure> for IslandError {
    fn from(_: StorageFailure) -> Self {
        Self::StorageFailure
    }
}

/// Errors raised while building or shutting down the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a {0} before building")]
    MissingCollaborator(&'static str),

    #[error("failed to sync challenge definitions to the record store")]
    ChallengeSync(#[source] StorageFailure),

    #[error("runtime worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_variants() {
        assert!(IslandError::RealmNotReady.is_retryable());
        assert!(IslandError::WorkerUnavailable.is_retryable());
        assert!(!IslandError::NotFound.is_retryable());
        assert!(!IslandError::StorageFailure.is_retryable());
    }

    #[test]
    fn test_storage_failure_maps_to_opaque_variant() {
        let err: IslandError = StorageFailure.into();
        assert!(matches!(err, IslandError::StorageFailure));
        assert_eq!(err.to_string(), "island records could not be read or written");
    }
}
