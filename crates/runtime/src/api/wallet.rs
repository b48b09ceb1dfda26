//! Player currency contract (units).

use async_trait::async_trait;
use island_core::PlayerId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("balance too low: need {needed}, have {available}")]
    Insufficient { needed: u64, available: u64 },

    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// External economy holding each player's units.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn balance(&self, player: PlayerId) -> Result<u64, WalletError>;

    /// Fails with [`WalletError::Insufficient`] without changing the balance.
    async fn debit(&self, player: PlayerId, amount: u64) -> Result<(), WalletError>;

    async fn credit(&self, player: PlayerId, amount: u64) -> Result<(), WalletError>;
}
