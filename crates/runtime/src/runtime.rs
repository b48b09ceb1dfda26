//! High-level island runtime.
//!
//! The runtime owns the background workers, wires the realm command channel
//! and the event bus, and exposes a builder-based API for hosts to plug in
//! their realm backend, wallet, notifier and record store.

use std::sync::Arc;

use island_core::{ChallengeRegistry, IslandConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{IslandHandle, Notifier, NullNotifier, RealmBackend, RuntimeError, Wallet};
use crate::events::EventBus;
use crate::lifecycle::Orchestrator;
use crate::progression::{ProgressCache, ProgressionEngine};
use crate::repository::{InMemoryRecords, RecordStore, Records};
use crate::upgrade::UpgradeLedger;
use crate::workers::{EvictionCommand, EvictionWorker, RealmChannel, RealmCommand, RealmWorker};

/// Main runtime that owns the island workers
///
/// [`IslandHandle`] provides a cloneable façade for clients.
pub struct IslandRuntime {
    handle: IslandHandle,
    orchestrator: Arc<Orchestrator>,
    realm: RealmChannel,

    // Background workers
    realm_worker_handle: JoinHandle<()>,
    eviction_tx: Option<mpsc::Sender<EvictionCommand>>,
    eviction_worker_handle: Option<JoinHandle<()>>,
}

impl IslandRuntime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> IslandHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &IslandConfig {
        self.orchestrator.config()
    }

    /// Shutdown the runtime gracefully
    ///
    /// Stops the eviction worker, writes every loaded island back to the
    /// store, then drains the realm worker.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        if let Some(eviction_tx) = &self.eviction_tx {
            let _ = eviction_tx.send(EvictionCommand::Shutdown).await;
        }
        if let Some(eviction_handle) = self.eviction_worker_handle {
            eviction_handle.await.map_err(RuntimeError::WorkerJoin)?;
        }

        let failed = self.orchestrator.flush_all().await;
        if failed > 0 {
            warn!("{} islands could not be saved during shutdown", failed);
        }

        self.realm.shutdown().await;
        self.realm_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        info!("Island runtime stopped");
        Ok(())
    }
}

/// Builder for [`IslandRuntime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: IslandConfig,
    records: Option<Arc<dyn Records>>,
    realm_backend: Option<Arc<dyn RealmBackend>>,
    wallet: Option<Arc<dyn Wallet>>,
    notifier: Option<Arc<dyn Notifier>>,
    challenges: ChallengeRegistry,
    enable_eviction: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: IslandConfig::default(),
            records: None,
            realm_backend: None,
            wallet: None,
            notifier: None,
            challenges: ChallengeRegistry::default(),
            enable_eviction: true,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: IslandConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the record storage (defaults to in-memory records)
    pub fn records(mut self, records: Arc<dyn Records>) -> Self {
        self.records = Some(records);
        self
    }

    /// Set required realm backend
    pub fn realm_backend(mut self, backend: Arc<dyn RealmBackend>) -> Self {
        self.realm_backend = Some(backend);
        self
    }

    /// Set required wallet for unit balances
    pub fn wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Set player notifier (optional)
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Challenge catalog; written to the record store on build.
    pub fn challenges(mut self, registry: ChallengeRegistry) -> Self {
        self.challenges = registry;
        self
    }

    /// Run the periodic idle-eviction worker (default: true)
    ///
    /// With the worker disabled, [`IslandHandle::evict_idle`] still runs a
    /// pass inline.
    pub fn enable_eviction(mut self, enable: bool) -> Self {
        self.enable_eviction = enable;
        self
    }

    /// Build the runtime
    pub async fn build(self) -> Result<IslandRuntime, RuntimeError> {
        let backend = self
            .realm_backend
            .ok_or(RuntimeError::MissingCollaborator("realm backend"))?;
        let wallet = self
            .wallet
            .ok_or(RuntimeError::MissingCollaborator("wallet"))?;
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(NullNotifier) as Arc<dyn Notifier>);
        let records = self
            .records
            .unwrap_or_else(|| Arc::new(InMemoryRecords::default()) as Arc<dyn Records>);

        let store = RecordStore::new(records);
        let synced = store
            .sync_challenges(&self.challenges)
            .await
            .map_err(RuntimeError::ChallengeSync)?;

        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let (realm_tx, realm_rx) = mpsc::channel::<RealmCommand>(self.config.command_buffer_size);
        let realm = RealmChannel::new(realm_tx);
        let realm_worker = RealmWorker::new(backend, realm_rx);
        let realm_worker_handle = tokio::spawn(async move {
            realm_worker.run().await;
        });

        let progress = Arc::new(ProgressCache::new());
        let orchestrator = Arc::new(Orchestrator::new(
            self.config.clone(),
            store,
            realm.clone(),
            wallet,
            notifier,
            event_bus.clone(),
            Arc::clone(&progress),
        ));
        let progression = Arc::new(ProgressionEngine::new(
            Arc::new(self.challenges),
            progress,
            Arc::clone(&orchestrator),
        ));
        let upgrades = Arc::new(UpgradeLedger::new(Arc::clone(&orchestrator)));

        // Create eviction worker (if enabled)
        let (eviction_tx, eviction_worker_handle) = if self.enable_eviction {
            let (tx, rx) = mpsc::channel::<EvictionCommand>(self.config.command_buffer_size);
            let worker = EvictionWorker::new(
                Arc::clone(&orchestrator),
                self.config.eviction_period(),
                rx,
            );
            let handle = tokio::spawn(async move {
                worker.run().await;
            });
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        let handle = IslandHandle::new(
            Arc::clone(&orchestrator),
            upgrades,
            progression,
            event_bus,
            eviction_tx.clone(),
        );

        info!(
            "Island runtime started ({} challenges, eviction {})",
            synced,
            if eviction_tx.is_some() { "on" } else { "off" }
        );

        Ok(IslandRuntime {
            handle,
            orchestrator,
            realm,
            realm_worker_handle,
            eviction_tx,
            eviction_worker_handle,
        })
    }
}
