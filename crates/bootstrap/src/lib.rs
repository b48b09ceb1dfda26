//! Shared bootstrap utilities for island hosts.
//!
//! Provides configuration loading, logging setup, and runtime assembly so a
//! host process only has to supply its realm backend, wallet and notifier.
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::{RuntimeBuilder, RuntimeSetup};
pub use config::{ConfigOverrides, ServerConfig};
pub use logging::{LoggingGuard, init_logging};
