mod common;

use common::{challenge, harness, harness_with, test_config};
use island_core::{
    ChallengeRegistry, ChallengeScope, InteractionKind, IslandType, PlayerId, UpgradeKind,
};
use island_runtime::{IslandError, Notice};

#[tokio::test]
async fn test_size_upgrade_charges_units_and_grows_boundary() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 1_100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();

    let quote = handle
        .upgrade_quote(owner, UpgradeKind::Size)
        .await
        .unwrap()
        .expect("size is not capped");
    assert_eq!((quote.units, quote.tokens), (1_000, 0));

    let applied = handle.upgrade(owner, UpgradeKind::Size).await.unwrap();

    assert_eq!(applied, quote);
    assert_eq!(h.wallet.balance_of(owner), 0);
    let upgraded = handle.load(island.id).await.unwrap();
    assert_eq!(upgraded.levels.size, 1);
    assert_eq!(h.realm.boundary(island.id), Some(75));
    assert!(h.notifier.received(owner).contains(&Notice::Upgraded {
        kind: UpgradeKind::Size,
        level: 1
    }));

    let stored = handle
        .orchestrator()
        .store()
        .load_island(island.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.levels.size, 1);
}

#[tokio::test]
async fn test_short_units_leave_island_untouched() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 600);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();

    let err = handle.upgrade(owner, UpgradeKind::Size).await.unwrap_err();

    assert_eq!(
        err,
        IslandError::InsufficientUnits {
            needed: 1_000,
            available: 500
        }
    );
    assert_eq!(h.wallet.balance_of(owner), 500);
    assert_eq!(handle.load(island.id).await.unwrap().levels, island.levels);
}

#[tokio::test]
async fn test_short_tokens_are_checked_before_units() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 10_000);
    handle.create(owner, IslandType::Classic).await.unwrap();

    let err = handle
        .upgrade(owner, UpgradeKind::PlayerLimit)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        IslandError::InsufficientTokens {
            needed: 3,
            available: 0
        }
    );
    assert_eq!(h.wallet.balance_of(owner), 9_900);
}

#[tokio::test]
async fn test_one_shot_upgrade_caps_out() {
    let registry = ChallengeRegistry::new([challenge(
        "first_bricks",
        "blocks_placed",
        1,
        30,
        ChallengeScope::Island,
        &[],
    )])
    .unwrap();
    let h = harness_with(test_config(), registry).await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 5_100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    handle
        .record_interaction(owner, island.id, InteractionKind::BlocksPlaced, 1)
        .await
        .unwrap();
    assert_eq!(handle.load(island.id).await.unwrap().tokens, 30);

    handle.upgrade(owner, UpgradeKind::Weather).await.unwrap();
    let island = handle.load(island.id).await.unwrap();
    assert!(island.levels.weather_unlocked);
    assert_eq!(island.tokens, 5);

    let err = handle.upgrade(owner, UpgradeKind::Weather).await.unwrap_err();
    assert_eq!(err, IslandError::MaxLevelReached(UpgradeKind::Weather));
    assert!(
        handle
            .upgrade_quote(owner, UpgradeKind::Weather)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_failed_save_refunds_units() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 1_100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    h.records.set_write_failure(true);

    let err = handle.upgrade(owner, UpgradeKind::Size).await.unwrap_err();

    assert_eq!(err, IslandError::StorageFailure);
    assert_eq!(h.wallet.balance_of(owner), 1_000);
    assert_eq!(handle.load(island.id).await.unwrap().levels.size, 0);
    assert_eq!(h.realm.boundary(island.id), Some(50));
}

#[tokio::test]
async fn test_concurrent_upgrades_charge_once() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 1_100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();

    let (a, b) = tokio::join!(
        handle.upgrade(owner, UpgradeKind::Size),
        handle.upgrade(owner, UpgradeKind::Size),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(h.wallet.balance_of(owner), 0);
    assert_eq!(handle.load(island.id).await.unwrap().levels.size, 1);
}

#[tokio::test]
async fn test_upgrade_without_island_is_not_found() {
    let h = harness().await;
    let handle = h.runtime.handle();
    let stranger = PlayerId::random();

    let err = handle.upgrade(stranger, UpgradeKind::Size).await.unwrap_err();
    assert_eq!(err, IslandError::NotFound);
}
