//! Island lifecycle orchestrator.
//!
//! The orchestrator is the only component that mutates the cache and the
//! record store together. Per island it drives the state machine
//!
//! ```text
//! Unprovisioned -> Provisioning -> Loaded <-> Idle -> Deleted
//! ```
//!
//! where `Idle` means evicted from memory but present in the store.
//!
//! Concurrency rules:
//! - loads are single-flight per island through [`KeyedGates`], and a
//!   deletion holds the same gate so nothing loads an island mid-delete
//! - creation and deletion are serialized per owner
//! - every mutation of a loaded island happens under its entry lock
//!   ([`IslandGuard`]), which is also what makes currency debits race-free

mod gates;
mod members;
mod teleport;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use island_core::{
    InteractionKind, Island, IslandConfig, IslandId, IslandStatistics, IslandType, Membership,
    PlayerId,
};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

pub use gates::{GateGuard, KeyedGates};
pub use teleport::TeleportOutcome;

use crate::api::{
    IslandError, Notice, Notifier, RealmSpec, Result, TeleportKind, Wallet, WalletError,
};
use crate::cache::{IslandCache, IslandEntry};
use crate::events::{EventBus, LifecycleEvent};
use crate::progression::ProgressCache;
use crate::repository::RecordStore;
use crate::statistics::StatisticsTracker;
use crate::workers::RealmChannel;

/// Where an island is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    /// Never created, or unknown to this runtime.
    Unprovisioned,
    /// Realm being created or loaded.
    Provisioning,
    Loaded,
    /// Persisted but not in memory.
    Idle,
    Deleted,
}

/// Exclusive access to a loaded island.
///
/// Holding the guard is holding the island's entry lock. Changes made
/// through it are visible to everyone once it drops, but are only durable
/// after [`Orchestrator::commit`] or an explicit save.
pub struct IslandGuard {
    entry: Arc<IslandEntry>,
    island: OwnedMutexGuard<Island>,
}

impl IslandGuard {
    pub fn entry(&self) -> &Arc<IslandEntry> {
        &self.entry
    }
}

impl Deref for IslandGuard {
    type Target = Island;

    fn deref(&self) -> &Island {
        &self.island
    }
}

impl DerefMut for IslandGuard {
    fn deref_mut(&mut self) -> &mut Island {
        &mut self.island
    }
}

/// Outcome of one idle-eviction pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub evicted: Vec<IslandId>,
    /// Idle islands kept in memory because flushing them failed.
    pub retained: Vec<IslandId>,
    pub invitations_pruned: usize,
}

/// Steps of a creation that succeeded, so a failure can undo exactly those.
#[derive(Default)]
struct Creation {
    island: bool,
    membership: bool,
    statistics: bool,
    realm: bool,
}

pub struct Orchestrator {
    config: IslandConfig,
    cache: Arc<IslandCache>,
    store: RecordStore,
    realm: RealmChannel,
    wallet: Arc<dyn Wallet>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    stats: StatisticsTracker,
    progress: Arc<ProgressCache>,
    load_gates: KeyedGates<IslandId>,
    owner_gates: KeyedGates<PlayerId>,
    member_gates: KeyedGates<IslandId>,
    provisioning: DashSet<IslandId>,
    deleted: DashSet<IslandId>,
}

impl Orchestrator {
    pub fn new(
        config: IslandConfig,
        store: RecordStore,
        realm: RealmChannel,
        wallet: Arc<dyn Wallet>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
        progress: Arc<ProgressCache>,
    ) -> Self {
        Self {
            config,
            cache: Arc::new(IslandCache::new()),
            store,
            realm,
            wallet,
            notifier,
            events,
            stats: StatisticsTracker::new(),
            progress,
            load_gates: KeyedGates::new(),
            owner_gates: KeyedGates::new(),
            member_gates: KeyedGates::new(),
            provisioning: DashSet::new(),
            deleted: DashSet::new(),
        }
    }

    pub fn config(&self) -> &IslandConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<IslandCache> {
        &self.cache
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Progress records changed while their island has been loaded.
    pub fn progress_cache(&self) -> &Arc<ProgressCache> {
        &self.progress
    }

    pub(crate) fn realm(&self) -> &RealmChannel {
        &self.realm
    }

    pub(crate) fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Creates an island for `owner`, charging the type's cost.
    ///
    /// Any failure after the debit undoes the steps already taken and refunds
    /// the cost before the original error is returned.
    pub async fn create(&self, owner: PlayerId, kind: IslandType) -> Result<Island> {
        let _gate = self.owner_gates.acquire(owner).await;

        if self.cache.get_by_owner(owner).is_some()
            || self.store.load_island_by_owner(owner).await?.is_some()
        {
            return Err(IslandError::AlreadyExists);
        }

        let cost = kind.cost();
        let available = self.wallet.balance(owner).await?;
        if available < cost {
            return Err(IslandError::InsufficientFunds {
                needed: cost,
                available,
            });
        }
        self.wallet
            .debit(owner, cost)
            .await
            .map_err(|e| match e {
                WalletError::Insufficient { needed, available } => {
                    IslandError::InsufficientFunds { needed, available }
                }
                other => IslandError::Wallet(other),
            })?;

        let now = Utc::now();
        let island = Island::new(IslandId::random(), owner, kind, now);
        self.provisioning.insert(island.id);

        let mut done = Creation::default();
        if let Err(err) = self.provision_new(&island, now, &mut done).await {
            warn!(
                "Creating island {} for {} failed: {}; rolling back",
                island.id, owner, err
            );
            self.compensate(&island, &done).await;
            if let Err(refund) = self.wallet.credit(owner, cost).await {
                error!("Refund of {} units to {} failed: {}", cost, owner, refund);
            }
            self.provisioning.remove(&island.id);
            return Err(err);
        }

        self.stats.attach(IslandStatistics::new(island.id));
        self.cache.put(island.clone());
        self.provisioning.remove(&island.id);

        info!("Created {} island {} for {}", kind, island.id, owner);
        self.events.publish(LifecycleEvent::Created {
            island: island.id,
            owner,
            kind,
        });
        self.notifier
            .notify(&[owner], &Notice::IslandCreated { island: island.id });

        Ok(island)
    }

    async fn provision_new(
        &self,
        island: &Island,
        now: DateTime<Utc>,
        done: &mut Creation,
    ) -> Result<()> {
        self.store.save_island(island).await?;
        done.island = true;

        self.store
            .save_membership(&Membership::owner(island.id, island.owner, now))
            .await?;
        done.membership = true;

        self.store
            .save_statistics(&IslandStatistics::new(island.id))
            .await?;
        done.statistics = true;

        self.realm.provision(RealmSpec::for_island(island)).await?;
        done.realm = true;

        self.realm
            .set_boundary(island.id, island.border_size())
            .await?;
        Ok(())
    }

    async fn compensate(&self, island: &Island, done: &Creation) {
        if done.realm && self.realm.delete(island.id).await.is_err() {
            warn!("Could not delete realm of failed island {}", island.id);
        }
        // Store failures below are already logged by the store.
        if done.statistics {
            let _ = self.store.delete_statistics(island.id).await;
        }
        if done.membership {
            let _ = self.store.delete_memberships(island.id).await;
        }
        if done.island {
            let _ = self.store.delete_island(island.id).await;
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Resolves a loaded island, bringing it online from the store on a miss.
    ///
    /// Concurrent loads of one island share a single backend load.
    pub async fn load(&self, id: IslandId) -> Result<Arc<IslandEntry>> {
        if let Some(entry) = self.touch_cached(id).await {
            return Ok(entry);
        }

        let _gate = self.load_gates.acquire(id).await;
        if let Some(entry) = self.touch_cached(id).await {
            return Ok(entry);
        }
        if self.deleted.contains(&id) {
            return Err(IslandError::NotFound);
        }

        let island = self
            .store
            .load_island(id)
            .await?
            .ok_or(IslandError::NotFound)?;
        self.bring_online(island).await
    }

    pub async fn load_by_owner(&self, owner: PlayerId) -> Result<Arc<IslandEntry>> {
        let id = self.owned_island_id(owner).await?;
        self.load(id).await
    }

    async fn touch_cached(&self, id: IslandId) -> Option<Arc<IslandEntry>> {
        let entry = self.cache.get(id)?;
        entry.state.lock().await.touch(Utc::now());
        // Evicted while we waited for the lock.
        self.cache.holds(&entry).then_some(entry)
    }

    async fn bring_online(&self, mut island: Island) -> Result<Arc<IslandEntry>> {
        let id = island.id;
        let stats = self
            .store
            .load_statistics(id)
            .await?
            .unwrap_or_else(|| IslandStatistics::new(id));

        self.provisioning.insert(id);
        let reprovisioned = match self.attach_realm(&island).await {
            Ok(reprovisioned) => reprovisioned,
            Err(err) => {
                self.provisioning.remove(&id);
                return Err(err);
            }
        };

        island.touch(Utc::now());
        self.stats.attach(stats);
        let entry = self.cache.put(island);
        self.provisioning.remove(&id);

        info!("Loaded island {} (reprovisioned: {})", id, reprovisioned);
        self.events.publish(LifecycleEvent::Loaded {
            island: id,
            reprovisioned,
        });
        Ok(entry)
    }

    /// Loads the realm, provisioning it again from the record if the backend
    /// has none, and re-applies the boundary.
    async fn attach_realm(&self, island: &Island) -> Result<bool> {
        let reprovisioned = match self.realm.load(island.id).await? {
            Some(_) => false,
            None => {
                warn!(
                    "No realm stored for island {}; provisioning from its record",
                    island.id
                );
                self.realm.provision(RealmSpec::for_island(island)).await?;
                true
            }
        };

        if let Err(err) = self
            .realm
            .set_boundary(island.id, island.border_size())
            .await
        {
            warn!("Could not apply boundary to island {}: {}", island.id, err);
        }
        Ok(reprovisioned)
    }

    /// Loads an island and takes its entry lock.
    pub async fn lock_loaded(&self, id: IslandId) -> Result<IslandGuard> {
        loop {
            let entry = self.load(id).await?;
            let island = Arc::clone(&entry.state).lock_owned().await;
            if self.cache.holds(&entry) {
                return Ok(IslandGuard { entry, island });
            }
            debug!("Island {} left the cache while locking; reloading", id);
        }
    }

    /// Applies `f` to a locked island and persists the result. If saving
    /// fails the in-memory island is restored.
    ///
    /// `f` must not mutate the island when it returns an error.
    pub async fn commit<T>(
        &self,
        island: &mut IslandGuard,
        f: impl FnOnce(&mut Island) -> Result<T>,
    ) -> Result<T> {
        let before = (**island).clone();
        let value = f(&mut **island)?;
        if let Err(failure) = self.store.save_island(&**island).await {
            **island = before;
            return Err(failure.into());
        }
        Ok(value)
    }

    /// Id of the island `owner` owns, from the cache or the store.
    pub async fn owned_island_id(&self, owner: PlayerId) -> Result<IslandId> {
        if let Some(entry) = self.cache.get_by_owner(owner) {
            return Ok(entry.id);
        }
        self.store
            .load_island_by_owner(owner)
            .await?
            .map(|island| island.id)
            .ok_or(IslandError::NotFound)
    }

    /// Island the player belongs to: the one they own, else the first one
    /// they are a member of.
    pub async fn island_of_member(&self, player: PlayerId) -> Result<IslandId> {
        match self.owned_island_id(player).await {
            Err(IslandError::NotFound) => self
                .store
                .memberships_of_player(player)
                .await?
                .into_iter()
                .next()
                .map(|m| m.island_id)
                .ok_or(IslandError::NotFound),
            other => other,
        }
    }

    /// Snapshot of an island, loading it if needed.
    pub async fn snapshot(&self, id: IslandId) -> Result<Island> {
        let entry = self.load(id).await?;
        let island = entry.state.lock().await;
        Ok(island.clone())
    }

    pub async fn state_of(&self, id: IslandId) -> Result<LifecycleState> {
        if self.deleted.contains(&id) {
            return Ok(LifecycleState::Deleted);
        }
        if self.provisioning.contains(&id) {
            return Ok(LifecycleState::Provisioning);
        }
        if self.cache.is_loaded(id) {
            return Ok(LifecycleState::Loaded);
        }
        Ok(match self.store.load_island(id).await? {
            Some(_) => LifecycleState::Idle,
            None => LifecycleState::Unprovisioned,
        })
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Deletes `owner`'s island: occupants are moved out first, then the realm
    /// is unloaded and deleted, then every record of the island goes.
    pub async fn delete(&self, owner: PlayerId) -> Result<()> {
        let _gate = self.owner_gates.acquire(owner).await;
        let id = self.owned_island_id(owner).await?;
        // Held until the records are gone; a load waiting here finds nothing.
        let _load_gate = self.load_gates.acquire(id).await;

        // Hold the entry lock, if loaded, so nothing mutates the island meanwhile.
        let held = match self.cache.get(id) {
            Some(entry) => Some(Arc::clone(&entry.state).lock_owned().await),
            None => None,
        };

        let moved = self.evict_occupants(id).await?;
        self.realm.unload(id).await?;
        self.realm.delete(id).await?;

        self.cache.remove(id);
        self.stats.forget(id);
        self.progress.forget_island(id);

        let members: Vec<PlayerId> = self
            .store
            .memberships_of_island(id)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.player_id)
            .collect();

        self.store.delete_progress(id).await?;
        self.store.delete_invitations(id).await?;
        self.store.delete_statistics(id).await?;
        self.store.delete_memberships(id).await?;
        self.store.delete_island(id).await?;

        self.deleted.insert(id);
        drop(held);

        info!(
            "Deleted island {} of {} ({} occupants moved)",
            id, owner, moved
        );
        self.events
            .publish(LifecycleEvent::Deleted { island: id, owner });
        self.notifier
            .notify(&members, &Notice::IslandDeleted { island: id });
        Ok(())
    }

    /// Moves every occupant of `id` to the backend's fallback location and
    /// waits for each move to finish.
    async fn evict_occupants(&self, id: IslandId) -> Result<usize> {
        let occupants = self.cache.occupants(id);
        if occupants.is_empty() {
            return Ok(0);
        }

        let fallback = self.realm.fallback_location().await?;
        for &player in &occupants {
            let current = self.realm.realm_of(player).await?;
            let kind = TeleportKind::between(current.as_deref(), &fallback.realm_name);
            if let Err(err) = self
                .realm
                .move_player(player, fallback.clone(), kind)
                .await
            {
                warn!(
                    "Could not move {} out of island {}: {}",
                    player, id, err
                );
            }
            self.cache.mark_occupant_leave(id, player);
        }

        self.notifier
            .notify(&occupants, &Notice::MovedToFallback { island: id });
        Ok(occupants.len())
    }

    // ========================================================================
    // Idle eviction
    // ========================================================================

    /// One eviction pass at time `now`.
    ///
    /// Unoccupied islands idle past the threshold are persisted with their
    /// statistics and progress, unloaded, and dropped from the cache. An
    /// island whose flush fails stays cached for the next pass. Islands
    /// whose lock is held are in use and skipped.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> EvictionReport {
        let threshold = self.config.idle_threshold();
        let mut report = EvictionReport::default();

        for id in self.cache.loaded_ids() {
            let Some(entry) = self.cache.get(id) else {
                continue;
            };
            if self.cache.occupant_count(id) > 0 {
                continue;
            }
            let Ok(island) = Arc::clone(&entry.state).try_lock_owned() else {
                continue;
            };
            if !island.is_idle(now, threshold) || self.cache.occupant_count(id) > 0 {
                continue;
            }

            if let Err(err) = self.flush_island(&island).await {
                warn!("Keeping idle island {} loaded: {}", id, err);
                report.retained.push(id);
                continue;
            }
            if let Err(err) = self.realm.unload(id).await {
                warn!("Keeping idle island {} loaded: {}", id, err);
                report.retained.push(id);
                continue;
            }

            self.cache.remove(id);
            self.stats.forget(id);
            self.progress.forget_island(id);
            drop(island);

            info!("Evicted idle island {}", id);
            self.events.publish(LifecycleEvent::Evicted { island: id });
            report.evicted.push(id);
        }

        report.invitations_pruned = self.store.cleanup_expired(now).await.unwrap_or(0);
        report
    }

    /// Writes an island, its live statistics and its cached progress.
    async fn flush_island(&self, island: &Island) -> Result<()> {
        self.store.save_island(island).await?;
        if let Some(stats) = self.stats.snapshot(island.id) {
            self.store.save_statistics(&stats).await?;
        }
        for progress in self.progress.island_records(island.id) {
            self.store.save_progress(&progress).await?;
        }
        Ok(())
    }

    /// Flushes every loaded island, returning how many could not be written.
    pub async fn flush_all(&self) -> usize {
        let mut failed = 0;
        for id in self.cache.loaded_ids() {
            let Some(entry) = self.cache.get(id) else {
                continue;
            };
            let island = entry.state.lock().await;
            if self.flush_island(&island).await.is_err() {
                failed += 1;
            }
        }
        failed
    }

    // ========================================================================
    // Statistics
    // ========================================================================
    // Counters move under the entry lock: eviction holds it from the final
    // snapshot until the island is forgotten.

    pub async fn record_interaction(
        &self,
        id: IslandId,
        kind: InteractionKind,
        amount: u64,
    ) -> Result<()> {
        let _island = self.lock_loaded(id).await?;
        if self.stats.record_interaction(id, kind, amount) {
            Ok(())
        } else {
            Err(IslandError::NotFound)
        }
    }

    pub async fn record_playtime(&self, id: IslandId, secs: u64) -> Result<()> {
        let _island = self.lock_loaded(id).await?;
        if self.stats.add_playtime(id, secs) {
            Ok(())
        } else {
            Err(IslandError::NotFound)
        }
    }

    /// Live statistics for a loaded island, stored ones otherwise.
    pub async fn statistics(&self, id: IslandId) -> Result<IslandStatistics> {
        if let Some(stats) = self.stats.snapshot(id) {
            return Ok(stats);
        }
        self.store
            .load_statistics(id)
            .await?
            .ok_or(IslandError::NotFound)
    }
}
