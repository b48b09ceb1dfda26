//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate:
//! the error types, the collaborator contracts the host implements (realm
//! backend, wallet, notifier), and the cloneable [`IslandHandle`].

pub mod errors;
pub mod handle;
pub mod notifier;
pub mod realm;
pub mod wallet;

pub use errors::{IslandError, Result, RuntimeError};
pub use handle::IslandHandle;
pub use notifier::{Notice, Notifier, NullNotifier};
pub use realm::{Destination, RealmBackend, RealmError, RealmHandle, RealmSpec, TeleportKind};
pub use wallet::{Wallet, WalletError};
