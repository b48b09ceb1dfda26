//! Content factory for building registries from a data directory.

use std::path::{Path, PathBuf};

use island_core::{ChallengeRegistry, IslandConfig};

use crate::loaders::{ChallengeLoader, ConfigLoader, LoadResult};

/// Content factory that loads all island content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── challenges.ron
/// ```
///
/// Both files are optional: a missing `config.toml` yields the default
/// configuration and a missing `challenges.ron` yields the bundled catalog.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load runtime configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<IslandConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(IslandConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load and validate the challenge registry from `challenges.ron`.
    pub fn load_challenges(&self) -> LoadResult<ChallengeRegistry> {
        let path = self.data_dir.join("challenges.ron");
        if !path.exists() {
            return ChallengeLoader::bundled();
        }
        ChallengeLoader::load_registry(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn test_empty_directory_falls_back_to_bundled_content() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ContentFactory::new(dir.path());

        assert_eq!(factory.load_config().unwrap(), IslandConfig::default());
        assert!(!factory.load_challenges().unwrap().is_empty());
    }
}
