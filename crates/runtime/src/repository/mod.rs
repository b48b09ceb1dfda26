//! Repository layer for durable island records.
//!
//! Repositories are plain CRUD over the six record kinds (islands,
//! memberships, statistics, invitations, challenges, challenge progress).
//! They never enforce business rules:
//! - [`traits`] defines one synchronous contract per record kind
//! - [`InMemoryRecords`] and [`FileRecords`] implement all of them
//! - [`RecordStore`] is the async façade the runtime talks to

mod error;
mod file;
mod memory;
mod store;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileRecords;
pub use memory::InMemoryRecords;
pub use store::{RecordStore, StorageFailure, StoreResult};
pub use traits::{
    ChallengeRepository, InvitationRepository, IslandRepository, MembershipRepository,
    ProgressRepository, Records, StatisticsRepository,
};
