mod common;

use std::sync::Arc;

use common::{FakeRealm, FakeWallet, test_config};
use island_core::{IslandType, PlayerId};
use island_runtime::{FileRecords, IslandError, IslandRuntime, RealmBackend, Records, Wallet};
use tempfile::TempDir;

async fn start(dir: &TempDir, realm: &Arc<FakeRealm>, wallet: &Arc<FakeWallet>) -> IslandRuntime {
    let records = FileRecords::new(dir.path()).expect("records dir should open");
    IslandRuntime::builder()
        .config(test_config())
        .records(Arc::new(records) as Arc<dyn Records>)
        .realm_backend(Arc::clone(realm) as Arc<dyn RealmBackend>)
        .wallet(Arc::clone(wallet) as Arc<dyn Wallet>)
        .enable_eviction(false)
        .build()
        .await
        .expect("runtime should build")
}

#[tokio::test]
async fn test_islands_survive_restart() {
    let dir = TempDir::new().unwrap();
    let realm = FakeRealm::new();
    let wallet = FakeWallet::new();
    let owner = PlayerId::random();
    let friend = PlayerId::random();
    wallet.fund(owner, 100);

    let runtime = start(&dir, &realm, &wallet).await;
    let handle = runtime.handle();
    let err = handle.create(owner, IslandType::Frozen).await.unwrap_err();
    assert!(matches!(err, IslandError::InsufficientFunds { .. }));
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    handle.invite(owner, friend).await.unwrap();
    handle.accept_invite(friend, island.id).await.unwrap();
    handle.teleport(owner, island.id).await.unwrap();
    runtime.shutdown().await.unwrap();

    let runtime = start(&dir, &realm, &wallet).await;
    let handle = runtime.handle();
    assert!(!handle.is_loaded(island.id));

    let reloaded = handle.load_by_owner(owner).await.unwrap();
    assert_eq!(reloaded.id, island.id);
    assert_eq!(reloaded.realm_name, island.realm_name);
    assert_eq!(handle.members(island.id).await.unwrap().len(), 2);
    assert_eq!(handle.statistics(island.id).await.unwrap().visits, 1);
    assert_eq!(FakeRealm::count(&realm.loads), 1);
    assert_eq!(FakeRealm::count(&realm.provisions), 1);

    runtime.shutdown().await.unwrap();
}
