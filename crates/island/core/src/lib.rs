//! Island rules and data types shared by the runtime and content loaders.
//!
//! `island-core` defines the canonical island model (levels, currencies,
//! memberships, statistics), the upgrade cost curves, and the challenge
//! definitions together with the validated prerequisite graph. Everything here
//! is pure: persistence, caching and realm provisioning live in the runtime.
pub mod challenge;
pub mod config;
pub mod ids;
pub mod island;
pub mod membership;
pub mod stats;
pub mod upgrade;

pub use challenge::{
    ChallengeDefinition, ChallengeProgress, ChallengeRegistry, ChallengeScope, Difficulty,
    ProgressKey, ProgressStep, RegistryError,
};
pub use config::IslandConfig;
pub use ids::{ChallengeId, IslandId, PlayerId};
pub use island::{Island, IslandLevels, IslandType, IslandTypeProfile, Location};
pub use membership::{Invitation, Membership, Role};
pub use stats::{InteractionKind, IslandStatistics};
pub use upgrade::{UpgradeKind, UpgradeQuote};
