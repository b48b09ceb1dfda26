//! Test collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeRegistry, ChallengeScope, Difficulty, IslandConfig,
    IslandId, Location, PlayerId,
};
use island_runtime::{
    Destination, InMemoryRecords, IslandRuntime, Notice, Notifier, RealmBackend, RealmError,
    RealmHandle, RealmSpec, Records, TeleportKind, Wallet, WalletError,
};

pub const FALLBACK_REALM: &str = "spawn";

// ============================================================================
// Realm backend
// ============================================================================

/// In-memory realm backend with call counters and failure switches.
pub struct FakeRealm {
    stored: Mutex<HashMap<IslandId, String>>,
    loaded: Mutex<HashSet<IslandId>>,
    boundaries: Mutex<HashMap<IslandId, u32>>,
    players: Mutex<HashMap<PlayerId, String>>,
    pub provisions: AtomicUsize,
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub deletes: AtomicUsize,
    ready: AtomicBool,
    fail_provision: AtomicBool,
    load_delay_ms: AtomicU64,
    ready_delay_ms: AtomicU64,
}

impl Default for FakeRealm {
    fn default() -> Self {
        Self {
            stored: Mutex::default(),
            loaded: Mutex::default(),
            boundaries: Mutex::default(),
            players: Mutex::default(),
            provisions: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            ready: AtomicBool::new(true),
            fail_provision: AtomicBool::new(false),
            load_delay_ms: AtomicU64::new(0),
            ready_delay_ms: AtomicU64::new(0),
        }
    }
}

impl FakeRealm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_provisioning(&self, fail: bool) {
        self.fail_provision.store(fail, Ordering::SeqCst);
    }

    pub fn set_load_delay(&self, delay: Duration) {
        self.load_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes every readiness check take `delay`.
    pub fn set_ready_delay(&self, delay: Duration) {
        self.ready_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Forgets a stored realm, as if its world files were lost.
    pub fn lose_realm(&self, island: IslandId) {
        self.stored.lock().unwrap().remove(&island);
        self.loaded.lock().unwrap().remove(&island);
    }

    pub fn has_realm(&self, island: IslandId) -> bool {
        self.stored.lock().unwrap().contains_key(&island)
    }

    pub fn is_loaded(&self, island: IslandId) -> bool {
        self.loaded.lock().unwrap().contains(&island)
    }

    pub fn boundary(&self, island: IslandId) -> Option<u32> {
        self.boundaries.lock().unwrap().get(&island).copied()
    }

    pub fn realm_of_player(&self, player: PlayerId) -> Option<String> {
        self.players.lock().unwrap().get(&player).cloned()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealmBackend for FakeRealm {
    async fn provision(&self, spec: &RealmSpec) -> Result<RealmHandle, RealmError> {
        self.provisions.fetch_add(1, Ordering::SeqCst);
        if self.fail_provision.load(Ordering::SeqCst) {
            return Err(RealmError::Backend("disk full".into()));
        }
        self.stored
            .lock()
            .unwrap()
            .insert(spec.island_id, spec.realm_name.clone());
        self.loaded.lock().unwrap().insert(spec.island_id);
        Ok(RealmHandle {
            island_id: spec.island_id,
            realm_name: spec.realm_name.clone(),
        })
    }

    async fn load(&self, island: IslandId) -> Result<Option<RealmHandle>, RealmError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let Some(realm_name) = self.stored.lock().unwrap().get(&island).cloned() else {
            return Ok(None);
        };
        self.loaded.lock().unwrap().insert(island);
        Ok(Some(RealmHandle {
            island_id: island,
            realm_name,
        }))
    }

    async fn unload(&self, island: IslandId) -> Result<bool, RealmError> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(self.loaded.lock().unwrap().remove(&island))
    }

    async fn delete(&self, island: IslandId) -> Result<(), RealmError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.loaded.lock().unwrap().remove(&island);
        self.stored.lock().unwrap().remove(&island);
        Ok(())
    }

    async fn set_boundary(&self, island: IslandId, size: u32) -> Result<(), RealmError> {
        self.boundaries.lock().unwrap().insert(island, size);
        Ok(())
    }

    async fn is_ready(&self, island: IslandId, _location: &Location) -> bool {
        let delay = self.ready_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.ready.load(Ordering::SeqCst) && self.loaded.lock().unwrap().contains(&island)
    }

    async fn move_player(
        &self,
        player: PlayerId,
        destination: &Destination,
        _kind: TeleportKind,
    ) -> Result<(), RealmError> {
        self.players
            .lock()
            .unwrap()
            .insert(player, destination.realm_name.clone());
        Ok(())
    }

    async fn realm_of(&self, player: PlayerId) -> Option<String> {
        self.players.lock().unwrap().get(&player).cloned()
    }

    fn fallback_location(&self) -> Destination {
        Destination::new(FALLBACK_REALM, Location::default())
    }
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Default)]
pub struct FakeWallet {
    balances: Mutex<HashMap<PlayerId, u64>>,
}

impl FakeWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fund(&self, player: PlayerId, amount: u64) {
        *self.balances.lock().unwrap().entry(player).or_default() += amount;
    }

    pub fn balance_of(&self, player: PlayerId) -> u64 {
        self.balances
            .lock()
            .unwrap()
            .get(&player)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    async fn balance(&self, player: PlayerId) -> Result<u64, WalletError> {
        Ok(self.balance_of(player))
    }

    async fn debit(&self, player: PlayerId, amount: u64) -> Result<(), WalletError> {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(player).or_default();
        if *balance < amount {
            return Err(WalletError::Insufficient {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    async fn credit(&self, player: PlayerId, amount: u64) -> Result<(), WalletError> {
        *self.balances.lock().unwrap().entry(player).or_default() += amount;
        Ok(())
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Vec<PlayerId>, Notice)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Notices delivered to `player`, oldest first.
    pub fn received(&self, player: PlayerId) -> Vec<Notice> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipients, _)| recipients.contains(&player))
            .map(|(_, notice)| notice.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipients: &[PlayerId], notice: &Notice) {
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), notice.clone()));
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub runtime: IslandRuntime,
    pub realm: Arc<FakeRealm>,
    pub wallet: Arc<FakeWallet>,
    pub notifier: Arc<RecordingNotifier>,
    pub records: Arc<InMemoryRecords>,
}

/// Short ticks so readiness failures surface quickly.
pub fn test_config() -> IslandConfig {
    IslandConfig {
        teleport_tick_ms: 5,
        teleport_ready_attempts: 3,
        ..IslandConfig::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(test_config(), ChallengeRegistry::default()).await
}

pub async fn harness_with(config: IslandConfig, challenges: ChallengeRegistry) -> Harness {
    build_harness(config, challenges, false).await
}

pub async fn build_harness(
    config: IslandConfig,
    challenges: ChallengeRegistry,
    eviction: bool,
) -> Harness {
    let realm = FakeRealm::new();
    let wallet = FakeWallet::new();
    let notifier = RecordingNotifier::new();
    let records = Arc::new(InMemoryRecords::default());

    let runtime = IslandRuntime::builder()
        .config(config)
        .records(Arc::clone(&records) as Arc<dyn Records>)
        .realm_backend(Arc::clone(&realm) as Arc<dyn RealmBackend>)
        .wallet(Arc::clone(&wallet) as Arc<dyn Wallet>)
        .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
        .challenges(challenges)
        .enable_eviction(eviction)
        .build()
        .await
        .expect("runtime should build");

    Harness {
        runtime,
        realm,
        wallet,
        notifier,
        records,
    }
}

pub fn challenge(
    id: &str,
    metric: &str,
    target: u64,
    reward: u64,
    scope: ChallengeScope,
    prerequisites: &[&str],
) -> ChallengeDefinition {
    ChallengeDefinition {
        id: ChallengeId::new(id),
        name: id.replace('_', " "),
        category: "test".into(),
        difficulty: Difficulty::Easy,
        reward,
        metric: metric.into(),
        target,
        scope,
        prerequisites: prerequisites.iter().map(|p| ChallengeId::new(*p)).collect(),
    }
}
