//! Upgrade ledger: dual-currency purchases of island levels.
//!
//! Check, debit, increment and persist all happen under the island's entry
//! lock. Units are the last thing checked and the first thing written; when
//! persisting fails the island is restored and the units credited back.

use std::sync::Arc;

use island_core::{PlayerId, UpgradeKind, UpgradeQuote};
use tracing::{error, info, warn};

use crate::api::{IslandError, Notice, Result, WalletError};
use crate::events::ProgressionEvent;
use crate::lifecycle::Orchestrator;

pub struct UpgradeLedger {
    orchestrator: Arc<Orchestrator>,
}

impl UpgradeLedger {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Price of the next level of `kind` on the player's island, or `None`
    /// once it is capped.
    pub async fn quote(&self, player: PlayerId, kind: UpgradeKind) -> Result<Option<UpgradeQuote>> {
        let id = self.orchestrator.owned_island_id(player).await?;
        let island = self.orchestrator.snapshot(id).await?;
        Ok(kind.quote(&island))
    }

    /// Buys the next level of `kind` for the island `player` owns.
    pub async fn upgrade(&self, player: PlayerId, kind: UpgradeKind) -> Result<UpgradeQuote> {
        let id = self.orchestrator.owned_island_id(player).await?;
        let mut island = self.orchestrator.lock_loaded(id).await?;

        let quote = kind
            .quote(&island)
            .ok_or(IslandError::MaxLevelReached(kind))?;

        if island.tokens < quote.tokens {
            return Err(IslandError::InsufficientTokens {
                needed: quote.tokens,
                available: island.tokens,
            });
        }
        let wallet = self.orchestrator.wallet();
        let available = wallet.balance(player).await?;
        if available < quote.units {
            return Err(IslandError::InsufficientUnits {
                needed: quote.units,
                available,
            });
        }

        wallet
            .debit(player, quote.units)
            .await
            .map_err(|e| match e {
                WalletError::Insufficient { needed, available } => {
                    IslandError::InsufficientUnits { needed, available }
                }
                other => IslandError::Wallet(other),
            })?;

        let applied = self
            .orchestrator
            .commit(&mut island, |island| {
                if island.apply_upgrade(&quote) {
                    Ok(())
                } else {
                    Err(IslandError::InsufficientTokens {
                        needed: quote.tokens,
                        available: island.tokens,
                    })
                }
            })
            .await;
        if let Err(err) = applied {
            if let Err(refund) = wallet.credit(player, quote.units).await {
                error!(
                    "Refund of {} units to {} failed: {}",
                    quote.units, player, refund
                );
            }
            return Err(err);
        }

        if kind == UpgradeKind::Size {
            let size = island.border_size();
            if let Err(err) = self.orchestrator.realm().set_boundary(id, size).await {
                warn!(
                    "Boundary of island {} not updated to {}: {}; applied on next load",
                    id, size, err
                );
            }
        }
        drop(island);

        info!(
            "Island {} upgraded {} to level {} ({} units, {} tokens)",
            id, kind, quote.to_level, quote.units, quote.tokens
        );
        self.orchestrator
            .events()
            .publish(ProgressionEvent::Upgraded {
                island: id,
                kind,
                level: quote.to_level,
                units: quote.units,
                tokens: quote.tokens,
            });
        self.orchestrator.notifier().notify(
            &[player],
            &Notice::Upgraded {
                kind,
                level: quote.to_level,
            },
        );

        Ok(quote)
    }
}
