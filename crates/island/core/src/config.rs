use std::time::Duration;

/// Tunable parameters for the island runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IslandConfig {
    /// An unoccupied island untouched for longer than this is evicted.
    pub idle_threshold_secs: u64,
    /// Period of the idle-eviction scan.
    pub eviction_period_secs: u64,
    /// One scheduler tick of the realm worker, used between readiness polls.
    pub teleport_tick_ms: u64,
    /// Readiness polls before a teleport fails with `RealmNotReady`.
    pub teleport_ready_attempts: u32,
    pub invitation_ttl_secs: u64,
    /// Members per island, owner included.
    pub max_members: usize,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
}

impl IslandConfig {
    pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 300;
    pub const DEFAULT_EVICTION_PERIOD_SECS: u64 = 60;
    pub const DEFAULT_TELEPORT_TICK_MS: u64 = 50;
    pub const DEFAULT_TELEPORT_READY_ATTEMPTS: u32 = 20;
    pub const DEFAULT_INVITATION_TTL_SECS: u64 = 300;
    pub const DEFAULT_MAX_MEMBERS: usize = 8;

    pub fn new() -> Self {
        Self {
            idle_threshold_secs: Self::DEFAULT_IDLE_THRESHOLD_SECS,
            eviction_period_secs: Self::DEFAULT_EVICTION_PERIOD_SECS,
            teleport_tick_ms: Self::DEFAULT_TELEPORT_TICK_MS,
            teleport_ready_attempts: Self::DEFAULT_TELEPORT_READY_ATTEMPTS,
            invitation_ttl_secs: Self::DEFAULT_INVITATION_TTL_SECS,
            max_members: Self::DEFAULT_MAX_MEMBERS,
            command_buffer_size: 64,
            event_buffer_size: 256,
        }
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    pub fn eviction_period(&self) -> Duration {
        Duration::from_secs(self.eviction_period_secs.max(1))
    }

    pub fn teleport_tick(&self) -> Duration {
        Duration::from_millis(self.teleport_tick_ms)
    }

    pub fn invitation_ttl(&self) -> Duration {
        Duration::from_secs(self.invitation_ttl_secs)
    }
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self::new()
    }
}
