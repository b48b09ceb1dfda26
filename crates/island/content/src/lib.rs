//! Data-driven island content and loaders.
//!
//! This crate houses static content read at process start:
//! - Challenge catalogs (data-driven via RON)
//! - Runtime configuration (data-driven via TOML)
//!
//! Content is turned into immutable registries (see
//! [`island_core::ChallengeRegistry`]) and never appears in island state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ChallengeCatalog, ChallengeLoader, ConfigLoader, ContentFactory};
