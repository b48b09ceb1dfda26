//! Worker tasks that back the runtime orchestration.
//!
//! The realm worker is the single mutation context for realm work; the
//! eviction worker periodically unloads idle islands.

mod eviction;
mod realm;

pub use eviction::{EvictionCommand, EvictionWorker};
pub use realm::{RealmChannel, RealmCommand, RealmWorker};
