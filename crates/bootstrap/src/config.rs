//! Host configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use island_core::IslandConfig;

/// Configuration required to bootstrap an island runtime in a host process.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory holding `config.toml` and `challenges.ron`. Without it the
    /// bundled catalog and default tuning are used.
    pub content_dir: Option<PathBuf>,
    /// Where island records are written (default: platform-specific).
    pub save_data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// Keep records in memory only; nothing survives a restart.
    pub in_memory: bool,
    pub enable_eviction: bool,
    pub overrides: ConfigOverrides,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            content_dir: None,
            save_data_dir: None,
            log_dir: None,
            in_memory: false,
            enable_eviction: true,
            overrides: ConfigOverrides::default(),
        }
    }
}

/// Tuning values that take precedence over `config.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub idle_threshold_secs: Option<u64>,
    pub eviction_period_secs: Option<u64>,
    pub invitation_ttl_secs: Option<u64>,
    pub max_members: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut IslandConfig) {
        if let Some(secs) = self.idle_threshold_secs {
            config.idle_threshold_secs = secs;
        }
        if let Some(secs) = self.eviction_period_secs {
            config.eviction_period_secs = secs.max(1);
        }
        if let Some(secs) = self.invitation_ttl_secs {
            config.invitation_ttl_secs = secs;
        }
        if let Some(members) = self.max_members {
            config.max_members = members.max(1);
        }
    }
}

impl ServerConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn load() -> Self {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ISLAND_CONTENT_DIR` - Directory with `config.toml` / `challenges.ron`
    /// - `ISLAND_SAVE_DIR` - Directory for island records (default: platform-specific)
    /// - `ISLAND_LOG_DIR` - Directory for log files (default: platform-specific)
    /// - `ISLAND_IN_MEMORY` - Keep records in memory only (default: false)
    /// - `ISLAND_ENABLE_EVICTION` - Run the idle-eviction worker (default: true)
    /// - `ISLAND_IDLE_THRESHOLD_SECS`, `ISLAND_EVICTION_PERIOD_SECS`,
    ///   `ISLAND_INVITATION_TTL_SECS`, `ISLAND_MAX_MEMBERS` - tuning overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.content_dir = env::var("ISLAND_CONTENT_DIR").ok().map(PathBuf::from);
        config.save_data_dir = env::var("ISLAND_SAVE_DIR").ok().map(PathBuf::from);
        config.log_dir = env::var("ISLAND_LOG_DIR").ok().map(PathBuf::from);

        if let Some(in_memory) = read_flag("ISLAND_IN_MEMORY") {
            config.in_memory = in_memory;
        }
        if let Some(enable) = read_flag("ISLAND_ENABLE_EVICTION") {
            config.enable_eviction = enable;
        }

        config.overrides = ConfigOverrides {
            idle_threshold_secs: read_env("ISLAND_IDLE_THRESHOLD_SECS"),
            eviction_period_secs: read_env("ISLAND_EVICTION_PERIOD_SECS"),
            invitation_ttl_secs: read_env("ISLAND_INVITATION_TTL_SECS"),
            max_members: read_env("ISLAND_MAX_MEMBERS"),
        };

        config
    }

    /// Record directory, falling back to the platform data directory.
    pub fn save_dir(&self) -> PathBuf {
        self.save_data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "islands")
                .map(|dirs| dirs.data_dir().join("records"))
                .unwrap_or_else(|| PathBuf::from("./save_data"))
        })
    }

    /// Log directory, falling back to the platform cache directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "islands")
                .map(|dirs| dirs.cache_dir().join("logs"))
                .unwrap_or_else(|| PathBuf::from("/tmp/islands/logs"))
        })
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// A set-but-empty variable counts as `true`.
fn read_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
