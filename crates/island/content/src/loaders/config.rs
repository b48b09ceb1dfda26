//! Runtime configuration loader.

use std::path::Path;

use island_core::IslandConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for island configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys fall back to [`IslandConfig::default`].
    pub fn load(path: &Path) -> LoadResult<IslandConfig> {
        let content = read_file(path)?;
        let config: IslandConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}
