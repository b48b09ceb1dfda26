//! Runtime orchestration for player-owned islands.
//!
//! This crate wires the record store, the live island cache, the realm worker
//! and the progression rules into a cohesive runtime API. Hosts embed
//! [`IslandRuntime`], plug in their realm backend, wallet and notifier, and
//! drive everything through a cloneable [`IslandHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the runtime and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`lifecycle`] creates, loads, evicts and deletes islands
//! - [`progression`] and [`upgrade`] spend and earn island currencies
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`workers`] keeps background tasks internal to the crate
//! - [`repository`] and [`cache`] hold persistent and live island data
pub mod api;
pub mod cache;
pub mod events;
pub mod lifecycle;
pub mod progression;
pub mod repository;
pub mod runtime;
pub mod statistics;
pub mod upgrade;

mod workers;

pub use api::{
    Destination, IslandError, IslandHandle, Notice, Notifier, NullNotifier, RealmBackend,
    RealmError, RealmHandle, RealmSpec, Result, RuntimeError, TeleportKind, Wallet, WalletError,
};
pub use cache::{IslandCache, IslandEntry, VisitRecord};
pub use events::{Event, EventBus, LifecycleEvent, ProgressionEvent, Topic};
pub use lifecycle::{EvictionReport, IslandGuard, LifecycleState, Orchestrator, TeleportOutcome};
pub use progression::{ProgressCache, ProgressionEngine};
pub use repository::{
    FileRecords, InMemoryRecords, RecordStore, Records, RepositoryError, StorageFailure,
};
pub use runtime::{IslandRuntime, RuntimeBuilder};
pub use statistics::StatisticsTracker;
pub use upgrade::UpgradeLedger;
