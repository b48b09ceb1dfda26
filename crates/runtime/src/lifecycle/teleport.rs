//! Teleport and visit protocol.
//!
//! Entering an island runs entirely under its entry lock, which deletion and
//! eviction also take. Occupancy and visit bookkeeping happen only after the
//! player has actually been moved.

use chrono::Utc;
use island_core::{IslandId, Location, PlayerId};
use tracing::{debug, warn};

use super::Orchestrator;
use crate::api::{Destination, IslandError, Result, TeleportKind};
use crate::events::LifecycleEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeleportOutcome {
    pub island: IslandId,
    pub kind: TeleportKind,
    /// First entry by this player since the island was loaded.
    pub first_visit: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EnterMode {
    /// A member going to their own island.
    Teleport,
    /// Anyone going to someone else's island; subject to limits.
    Visit,
}

impl Orchestrator {
    pub async fn teleport(&self, player: PlayerId, island: IslandId) -> Result<TeleportOutcome> {
        self.enter(player, island, EnterMode::Teleport).await
    }

    /// Visits the island owned by `owner`.
    pub async fn visit(&self, visitor: PlayerId, owner: PlayerId) -> Result<TeleportOutcome> {
        let island = self.owned_island_id(owner).await?;
        self.enter(visitor, island, EnterMode::Visit).await
    }

    /// Teleports a player to the island they own or belong to.
    pub async fn home(&self, player: PlayerId) -> Result<TeleportOutcome> {
        let island = self.island_of_member(player).await?;
        self.teleport(player, island).await
    }

    /// Marks the player as no longer inside the island they occupy.
    pub async fn leave(&self, player: PlayerId) -> Option<IslandId> {
        let island = self.cache.located(player)?;
        if !self.cache.mark_occupant_leave(island, player) {
            return None;
        }
        // The idle clock starts when the last player walks out.
        if let Some(entry) = self.cache.get(island) {
            entry.state.lock().await.touch(Utc::now());
        }

        self.events
            .publish(LifecycleEvent::Left { island, player });
        Some(island)
    }

    async fn enter(
        &self,
        player: PlayerId,
        id: IslandId,
        mode: EnterMode,
    ) -> Result<TeleportOutcome> {
        let mut island = self.lock_loaded(id).await?;
        let membership = self.store.load_membership(id, player).await?;
        let is_member = island.owner == player || membership.is_some();

        if mode == EnterMode::Visit {
            if !island.visitors_allowed && !is_member {
                return Err(IslandError::VisitorsDisallowed);
            }
            let limit = island.player_limit();
            if !self.cache.is_occupant(id, player) && self.cache.occupant_count(id) >= limit {
                return Err(IslandError::Full { limit });
            }
        }

        let kind = self
            .move_into(player, id, Destination::spawn_of(&island))
            .await?;

        island.touch(Utc::now());
        let visit = self
            .cache
            .mark_occupant_enter(id, player)
            .ok_or(IslandError::NotFound)?;
        self.stats.record_visit(id, visit.first_visit);
        drop(island);

        if let Some(mut membership) = membership {
            membership.last_visit = Some(Utc::now());
            // Failures are logged by the store; the visit itself stands.
            let _ = self.store.save_membership(&membership).await;
        }

        debug!("{} entered island {} ({})", player, id, kind);
        self.events.publish(LifecycleEvent::visited(
            id,
            player,
            visit.first_visit,
            kind,
        ));

        Ok(TeleportOutcome {
            island: id,
            kind,
            first_visit: visit.first_visit,
        })
    }

    async fn move_into(
        &self,
        player: PlayerId,
        id: IslandId,
        destination: Destination,
    ) -> Result<TeleportKind> {
        self.await_ready(id, destination.location).await?;

        let current = self.realm.realm_of(player).await?;
        let kind = TeleportKind::between(current.as_deref(), &destination.realm_name);
        self.realm.move_player(player, destination, kind).await?;
        Ok(kind)
    }

    /// Polls realm readiness once per scheduler tick, up to the configured
    /// number of attempts.
    async fn await_ready(&self, id: IslandId, location: Location) -> Result<()> {
        let attempts = self.config.teleport_ready_attempts.max(1);
        for attempt in 1..=attempts {
            if self.realm.is_ready(id, location).await? {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.teleport_tick()).await;
            }
        }

        warn!(
            "Realm of island {} not ready after {} attempts",
            id, attempts
        );
        Err(IslandError::RealmNotReady)
    }
}
