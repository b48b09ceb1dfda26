//! Builds the island runtime from content files, a save directory, and the
//! host's collaborators.
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use island_content::{ChallengeLoader, ContentFactory};
use island_core::{ChallengeRegistry, IslandConfig};
use island_runtime::{
    FileRecords, InMemoryRecords, IslandRuntime, Notifier, RealmBackend, Records, Wallet,
};
use tracing::info;

use crate::config::ServerConfig;

/// Builder that assembles content, records and collaborators into a runtime.
pub struct RuntimeBuilder {
    config: ServerConfig,
    realm_backend: Option<Arc<dyn RealmBackend>>,
    wallet: Option<Arc<dyn Wallet>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl RuntimeBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            realm_backend: None,
            wallet: None,
            notifier: None,
        }
    }

    pub fn realm_backend(mut self, backend: Arc<dyn RealmBackend>) -> Self {
        self.realm_backend = Some(backend);
        self
    }

    pub fn wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn build(self) -> Result<RuntimeSetup> {
        let backend = self
            .realm_backend
            .ok_or_else(|| anyhow!("a realm backend is required"))?;
        let wallet = self
            .wallet
            .ok_or_else(|| anyhow!("a wallet is required"))?;

        let (mut island_config, challenges) = load_content(&self.config)?;
        self.config.overrides.apply(&mut island_config);

        let records: Arc<dyn Records> = if self.config.in_memory {
            info!("Island records kept in memory only");
            Arc::new(InMemoryRecords::default())
        } else {
            let dir = self.config.save_dir();
            let records = FileRecords::new(&dir)
                .with_context(|| format!("Failed to open record store at {}", dir.display()))?;
            info!("Island records stored in {}", dir.display());
            Arc::new(records)
        };

        let mut builder = IslandRuntime::builder()
            .config(island_config.clone())
            .records(records)
            .realm_backend(backend)
            .wallet(wallet)
            .challenges(challenges)
            .enable_eviction(self.config.enable_eviction);
        if let Some(notifier) = self.notifier {
            builder = builder.notifier(notifier);
        }

        let runtime = builder.build().await?;

        Ok(RuntimeSetup {
            config: self.config,
            island_config,
            runtime,
        })
    }
}

pub struct RuntimeSetup {
    pub config: ServerConfig,
    /// Effective tuning after `config.toml` and environment overrides.
    pub island_config: IslandConfig,
    pub runtime: IslandRuntime,
}

fn load_content(config: &ServerConfig) -> Result<(IslandConfig, ChallengeRegistry)> {
    match &config.content_dir {
        Some(dir) => {
            let factory = ContentFactory::new(dir);
            let island_config = factory.load_config()?;
            let challenges = factory.load_challenges()?;
            info!(
                "Loaded content from {} ({} challenges)",
                factory.data_dir().display(),
                challenges.len()
            );
            Ok((island_config, challenges))
        }
        None => Ok((IslandConfig::default(), ChallengeLoader::bundled()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use island_core::{IslandId, IslandType, Location, PlayerId};
    use island_runtime::{
        Destination, RealmError, RealmHandle, RealmSpec, TeleportKind, WalletError,
    };
    use tempfile::TempDir;

    struct StaticRealm;

    #[async_trait]
    impl RealmBackend for StaticRealm {
        async fn provision(&self, spec: &RealmSpec) -> Result<RealmHandle, RealmError> {
            Ok(RealmHandle {
                island_id: spec.island_id,
                realm_name: spec.realm_name.clone(),
            })
        }

        async fn load(&self, island: IslandId) -> Result<Option<RealmHandle>, RealmError> {
            Ok(Some(RealmHandle {
                island_id: island,
                realm_name: format!("island_{}", island.simple()),
            }))
        }

        async fn unload(&self, _island: IslandId) -> Result<bool, RealmError> {
            Ok(true)
        }

        async fn delete(&self, _island: IslandId) -> Result<(), RealmError> {
            Ok(())
        }

        async fn set_boundary(&self, _island: IslandId, _size: u32) -> Result<(), RealmError> {
            Ok(())
        }

        async fn is_ready(&self, _island: IslandId, _location: &Location) -> bool {
            true
        }

        async fn move_player(
            &self,
            _player: PlayerId,
            _destination: &Destination,
            _kind: TeleportKind,
        ) -> Result<(), RealmError> {
            Ok(())
        }

        async fn realm_of(&self, _player: PlayerId) -> Option<String> {
            None
        }

        fn fallback_location(&self) -> Destination {
            Destination::new("spawn", Location::default())
        }
    }

    struct RichWallet;

    #[async_trait]
    impl Wallet for RichWallet {
        async fn balance(&self, _player: PlayerId) -> Result<u64, WalletError> {
            Ok(u64::MAX)
        }

        async fn debit(&self, _player: PlayerId, _amount: u64) -> Result<(), WalletError> {
            Ok(())
        }

        async fn credit(&self, _player: PlayerId, _amount: u64) -> Result<(), WalletError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_build_requires_collaborators() {
        let result = RuntimeBuilder::new(ServerConfig::default()).build().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_from_content_dir() {
        let content = TempDir::new().unwrap();
        let saves = TempDir::new().unwrap();
        std::fs::write(
            content.path().join("config.toml"),
            "idle_threshold_secs = 120\nmax_members = 3\n",
        )
        .unwrap();

        let mut config = ServerConfig {
            content_dir: Some(content.path().to_path_buf()),
            save_data_dir: Some(saves.path().to_path_buf()),
            enable_eviction: false,
            ..ServerConfig::default()
        };
        config.overrides.max_members = Some(5);

        let setup = RuntimeBuilder::new(config)
            .realm_backend(Arc::new(StaticRealm))
            .wallet(Arc::new(RichWallet))
            .build()
            .await
            .unwrap();

        assert_eq!(setup.island_config.idle_threshold_secs, 120);
        assert_eq!(setup.island_config.max_members, 5);

        let handle = setup.runtime.handle();
        let island = handle
            .create(PlayerId::random(), IslandType::Classic)
            .await
            .unwrap();
        assert!(saves.path().join("islands").exists());
        assert!(handle.is_loaded(island.id));

        setup.runtime.shutdown().await.unwrap();
    }
}
