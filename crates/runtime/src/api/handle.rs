//! Cloneable façade for issuing commands to the runtime.
//!
//! [`IslandHandle`] hides the orchestrator, ledger and engine wiring and
//! hands out island snapshots rather than live references.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeProgress, InteractionKind, Invitation, Island,
    IslandId, IslandStatistics, IslandType, Location, Membership, PlayerId, ProgressStep,
    UpgradeKind, UpgradeQuote,
};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{IslandError, Result};
use crate::events::{Event, EventBus, Topic};
use crate::lifecycle::{EvictionReport, LifecycleState, Orchestrator, TeleportOutcome};
use crate::progression::ProgressionEngine;
use crate::upgrade::UpgradeLedger;
use crate::workers::EvictionCommand;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct IslandHandle {
    orchestrator: Arc<Orchestrator>,
    upgrades: Arc<UpgradeLedger>,
    progression: Arc<ProgressionEngine>,
    event_bus: EventBus,
    eviction_tx: Option<mpsc::Sender<EvictionCommand>>,
}

impl IslandHandle {
    pub(crate) fn new(
        orchestrator: Arc<Orchestrator>,
        upgrades: Arc<UpgradeLedger>,
        progression: Arc<ProgressionEngine>,
        event_bus: EventBus,
        eviction_tx: Option<mpsc::Sender<EvictionCommand>>,
    ) -> Self {
        Self {
            orchestrator,
            upgrades,
            progression,
            event_bus,
            eviction_tx,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn create(&self, owner: PlayerId, kind: IslandType) -> Result<Island> {
        self.orchestrator.create(owner, kind).await
    }

    /// Loads an island (if needed) and returns a snapshot of it.
    pub async fn load(&self, id: IslandId) -> Result<Island> {
        self.orchestrator.snapshot(id).await
    }

    pub async fn load_by_owner(&self, owner: PlayerId) -> Result<Island> {
        let id = self.orchestrator.owned_island_id(owner).await?;
        self.orchestrator.snapshot(id).await
    }

    pub async fn delete(&self, owner: PlayerId) -> Result<()> {
        self.orchestrator.delete(owner).await
    }

    pub async fn state_of(&self, id: IslandId) -> Result<LifecycleState> {
        self.orchestrator.state_of(id).await
    }

    pub fn is_loaded(&self, id: IslandId) -> bool {
        self.orchestrator.cache().is_loaded(id)
    }

    pub fn occupants(&self, id: IslandId) -> Vec<PlayerId> {
        self.orchestrator.cache().occupants(id)
    }

    pub async fn teleport(&self, player: PlayerId, island: IslandId) -> Result<TeleportOutcome> {
        self.orchestrator.teleport(player, island).await
    }

    pub async fn visit(&self, visitor: PlayerId, owner: PlayerId) -> Result<TeleportOutcome> {
        self.orchestrator.visit(visitor, owner).await
    }

    pub async fn home(&self, player: PlayerId) -> Result<TeleportOutcome> {
        self.orchestrator.home(player).await
    }

    pub async fn leave(&self, player: PlayerId) -> Option<IslandId> {
        self.orchestrator.leave(player).await
    }

    /// Runs an idle-eviction pass now, through the eviction worker when it
    /// is running.
    pub async fn evict_idle(&self) -> Result<EvictionReport> {
        let Some(eviction_tx) = &self.eviction_tx else {
            return Ok(self.orchestrator.evict_idle(Utc::now()).await);
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        eviction_tx
            .send(EvictionCommand::SweepNow { reply: reply_tx })
            .await
            .map_err(|_| IslandError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| IslandError::WorkerUnavailable)
    }

    // ========================================================================
    // Settings and members
    // ========================================================================

    pub async fn rename(&self, owner: PlayerId, name: &str) -> Result<()> {
        self.orchestrator.rename(owner, name).await
    }

    pub async fn set_spawn(&self, owner: PlayerId, location: Location) -> Result<()> {
        self.orchestrator.set_spawn(owner, location).await
    }

    pub async fn set_pvp(&self, owner: PlayerId, enabled: bool) -> Result<()> {
        self.orchestrator.set_pvp(owner, enabled).await
    }

    pub async fn set_visitors_allowed(&self, owner: PlayerId, allowed: bool) -> Result<()> {
        self.orchestrator.set_visitors_allowed(owner, allowed).await
    }

    pub async fn invite(&self, owner: PlayerId, target: PlayerId) -> Result<Invitation> {
        self.orchestrator.invite(owner, target).await
    }

    pub async fn accept_invite(&self, player: PlayerId, island: IslandId) -> Result<Membership> {
        self.orchestrator.accept_invite(player, island).await
    }

    pub async fn remove_member(&self, owner: PlayerId, member: PlayerId) -> Result<()> {
        self.orchestrator.remove_member(owner, member).await
    }

    pub async fn members(&self, island: IslandId) -> Result<Vec<Membership>> {
        self.orchestrator.members(island).await
    }

    pub async fn pending_invitations(&self, player: PlayerId) -> Result<Vec<Invitation>> {
        self.orchestrator.pending_invitations(player).await
    }

    // ========================================================================
    // Statistics and progression
    // ========================================================================

    /// Counts a world interaction on an island and feeds it to every
    /// unlocked challenge tracking the same metric.
    pub async fn record_interaction(
        &self,
        player: PlayerId,
        island: IslandId,
        kind: InteractionKind,
        amount: u64,
    ) -> Result<Vec<(ChallengeId, ProgressStep)>> {
        self.orchestrator
            .record_interaction(island, kind, amount)
            .await?;
        self.progression
            .record_metric(player, island, kind.as_ref(), amount)
            .await
    }

    pub async fn record_playtime(&self, island: IslandId, secs: u64) -> Result<()> {
        self.orchestrator.record_playtime(island, secs).await
    }

    pub async fn statistics(&self, island: IslandId) -> Result<IslandStatistics> {
        self.orchestrator.statistics(island).await
    }

    pub async fn get_progress(
        &self,
        island: IslandId,
        player: Option<PlayerId>,
        challenge: &ChallengeId,
    ) -> Result<ChallengeProgress> {
        self.progression
            .get_progress(island, player, challenge)
            .await
    }

    pub async fn increment_progress(
        &self,
        player: PlayerId,
        island: IslandId,
        challenge: &ChallengeId,
        amount: u64,
    ) -> Result<ProgressStep> {
        self.progression
            .increment_progress(player, island, challenge, amount)
            .await
    }

    pub async fn are_prerequisites_satisfied(
        &self,
        island: IslandId,
        player: PlayerId,
        challenge: &ChallengeId,
    ) -> Result<bool> {
        self.progression
            .are_prerequisites_satisfied(island, player, challenge)
            .await
    }

    pub async fn available_challenges(
        &self,
        island: IslandId,
        player: PlayerId,
    ) -> Result<Vec<ChallengeDefinition>> {
        self.progression.available_challenges(island, player).await
    }

    pub async fn upgrade(&self, player: PlayerId, kind: UpgradeKind) -> Result<UpgradeQuote> {
        self.upgrades.upgrade(player, kind).await
    }

    pub async fn upgrade_quote(
        &self,
        player: PlayerId,
        kind: UpgradeKind,
    ) -> Result<Option<UpgradeQuote>> {
        self.upgrades.quote(player, kind).await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Lifecycle` - creation, loads, visits, evictions, deletions
    /// - `Topic::Progression` - challenge progress, completions, upgrades
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// The orchestrator behind this handle, for direct lifecycle control.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}
