mod common;

use chrono::Utc;
use common::{Harness, challenge, harness_with, test_config};
use island_core::{
    ChallengeId, ChallengeRegistry, ChallengeScope, InteractionKind, Island, IslandType, PlayerId,
    ProgressStep,
};
use island_runtime::{Event, IslandError, Notice, ProgressionEvent, Topic};

fn registry() -> ChallengeRegistry {
    ChallengeRegistry::new([
        challenge(
            "builders",
            "blocks_placed",
            10,
            40,
            ChallengeScope::Island,
            &[],
        ),
        challenge(
            "lumberjack",
            "blocks_broken",
            3,
            5,
            ChallengeScope::Player,
            &[],
        ),
        challenge(
            "farmer",
            "crops_harvested",
            3,
            15,
            ChallengeScope::Island,
            &["lumberjack"],
        ),
    ])
    .unwrap()
}

async fn island_with_member() -> (Harness, Island, PlayerId) {
    let h = harness_with(test_config(), registry()).await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    let member = PlayerId::random();
    h.wallet.fund(owner, 100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    handle.invite(owner, member).await.unwrap();
    handle.accept_invite(member, island.id).await.unwrap();
    (h, island, member)
}

#[tokio::test]
async fn test_shared_challenge_pays_out_once() {
    let (h, island, member) = island_with_member().await;
    let handle = h.runtime.handle();
    let owner = island.owner;
    let builders = ChallengeId::new("builders");
    let mut events = handle.subscribe(Topic::Progression);

    let first = handle
        .increment_progress(owner, island.id, &builders, 5)
        .await
        .unwrap();
    assert_eq!(first, ProgressStep::Advanced { current: 5 });

    let second = handle
        .increment_progress(member, island.id, &builders, 5)
        .await
        .unwrap();
    assert_eq!(second, ProgressStep::Completed { current: 10 });

    let third = handle
        .increment_progress(owner, island.id, &builders, 5)
        .await
        .unwrap();
    assert_eq!(third, ProgressStep::Unchanged);

    assert_eq!(handle.load(island.id).await.unwrap().tokens, 40);
    let progress = handle
        .get_progress(island.id, Some(owner), &builders)
        .await
        .unwrap();
    assert!(progress.completed);
    assert_eq!(progress.key.player, None);

    let completed = Notice::ChallengeCompleted {
        challenge: builders.clone(),
        name: "builders".into(),
        reward: 40,
    };
    for player in [owner, member] {
        let received = h.notifier.received(player);
        assert_eq!(received.iter().filter(|n| **n == completed).count(), 1);
    }

    let mut completions = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(
            event,
            Event::Progression(ProgressionEvent::ChallengeCompleted { .. })
        ) {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn test_player_challenge_is_tracked_per_player() {
    let (h, island, member) = island_with_member().await;
    let handle = h.runtime.handle();
    let owner = island.owner;
    let lumberjack = ChallengeId::new("lumberjack");

    handle
        .increment_progress(owner, island.id, &lumberjack, 3)
        .await
        .unwrap();

    let mine = handle
        .get_progress(island.id, Some(owner), &lumberjack)
        .await
        .unwrap();
    let theirs = handle
        .get_progress(island.id, Some(member), &lumberjack)
        .await
        .unwrap();
    assert!(mine.completed);
    assert_eq!(theirs.current, 0);
    assert!(!theirs.completed);

    assert!(
        h.notifier
            .received(owner)
            .iter()
            .any(|n| matches!(n, Notice::ChallengeCompleted { reward: 5, .. }))
    );
    assert!(
        !h.notifier
            .received(member)
            .iter()
            .any(|n| matches!(n, Notice::ChallengeCompleted { .. }))
    );
}

#[tokio::test]
async fn test_prerequisites_gate_metric_progress() {
    let (h, island, _member) = island_with_member().await;
    let handle = h.runtime.handle();
    let owner = island.owner;
    let farmer = ChallengeId::new("farmer");

    assert!(
        !handle
            .are_prerequisites_satisfied(island.id, owner, &farmer)
            .await
            .unwrap()
    );
    let available: Vec<ChallengeId> = handle
        .available_challenges(island.id, owner)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert!(!available.contains(&farmer));
    assert!(available.contains(&ChallengeId::new("lumberjack")));

    let steps = handle
        .record_interaction(owner, island.id, InteractionKind::CropsHarvested, 5)
        .await
        .unwrap();
    assert!(steps.is_empty());
    assert_eq!(
        handle
            .get_progress(island.id, None, &farmer)
            .await
            .unwrap()
            .current,
        0
    );

    let steps = handle
        .record_interaction(owner, island.id, InteractionKind::BlocksBroken, 3)
        .await
        .unwrap();
    assert_eq!(
        steps,
        vec![(
            ChallengeId::new("lumberjack"),
            ProgressStep::Completed { current: 3 }
        )]
    );
    assert!(
        handle
            .are_prerequisites_satisfied(island.id, owner, &farmer)
            .await
            .unwrap()
    );

    let steps = handle
        .record_interaction(owner, island.id, InteractionKind::CropsHarvested, 3)
        .await
        .unwrap();
    assert_eq!(
        steps,
        vec![(farmer.clone(), ProgressStep::Completed { current: 3 })]
    );
    assert_eq!(handle.load(island.id).await.unwrap().tokens, 5 + 15);

    let stats = handle.statistics(island.id).await.unwrap();
    assert_eq!(stats.crops_harvested, 8);
}

#[tokio::test]
async fn test_progress_survives_eviction() {
    let (h, island, _member) = island_with_member().await;
    let handle = h.runtime.handle();
    let builders = ChallengeId::new("builders");
    handle
        .increment_progress(island.owner, island.id, &builders, 4)
        .await
        .unwrap();

    let report = handle
        .orchestrator()
        .evict_idle(Utc::now() + chrono::Duration::hours(1))
        .await;
    assert_eq!(report.evicted, vec![island.id]);

    let progress = handle
        .get_progress(island.id, None, &builders)
        .await
        .unwrap();
    assert_eq!(progress.current, 4);

    let step = handle
        .increment_progress(island.owner, island.id, &builders, 6)
        .await
        .unwrap();
    assert_eq!(step, ProgressStep::Completed { current: 10 });
}

#[tokio::test]
async fn test_failed_write_changes_nothing() {
    let (h, island, _member) = island_with_member().await;
    let handle = h.runtime.handle();
    let builders = ChallengeId::new("builders");
    h.records.set_write_failure(true);

    let err = handle
        .increment_progress(island.owner, island.id, &builders, 10)
        .await
        .unwrap_err();
    assert_eq!(err, IslandError::StorageFailure);
    assert_eq!(handle.load(island.id).await.unwrap().tokens, 0);

    h.records.set_write_failure(false);
    let step = handle
        .increment_progress(island.owner, island.id, &builders, 10)
        .await
        .unwrap();
    assert_eq!(step, ProgressStep::Completed { current: 10 });
    assert_eq!(handle.load(island.id).await.unwrap().tokens, 40);
}

#[tokio::test]
async fn test_unknown_challenge_is_reported() {
    let (h, island, _member) = island_with_member().await;
    let handle = h.runtime.handle();
    let missing = ChallengeId::new("moon_landing");

    let err = handle
        .increment_progress(island.owner, island.id, &missing, 1)
        .await
        .unwrap_err();
    assert_eq!(err, IslandError::ChallengeNotFound(missing));
}

#[tokio::test]
async fn test_catalog_is_written_to_store() {
    let (h, _island, _member) = island_with_member().await;
    let handle = h.runtime.handle();

    let stored = handle.orchestrator().store().list_challenges().await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn test_bundled_catalog_unlocks_in_order() {
    let catalog = island_content::ChallengeLoader::bundled().expect("bundled catalog is valid");
    let h = harness_with(test_config(), catalog).await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    let master_builder = ChallengeId::new("master_builder");

    let steps = handle
        .record_interaction(owner, island.id, InteractionKind::BlocksPlaced, 64)
        .await
        .unwrap();

    // The placement that completes a prerequisite does not count twice.
    assert_eq!(
        steps,
        vec![(
            ChallengeId::new("first_steps"),
            ProgressStep::Completed { current: 64 }
        )]
    );
    assert_eq!(
        handle
            .get_progress(island.id, None, &master_builder)
            .await
            .unwrap()
            .current,
        0
    );

    handle
        .record_interaction(owner, island.id, InteractionKind::BlocksPlaced, 10)
        .await
        .unwrap();
    assert_eq!(
        handle
            .get_progress(island.id, None, &master_builder)
            .await
            .unwrap()
            .current,
        10
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_racing_increments_never_roll_progress_back() {
    let registry = ChallengeRegistry::new([challenge(
        "marathon",
        "blocks_placed",
        10_000,
        1,
        ChallengeScope::Island,
        &[],
    )])
    .unwrap();
    let h = harness_with(test_config(), registry).await;
    let handle = h.runtime.handle();
    let owner = PlayerId::random();
    h.wallet.fund(owner, 100);
    let island = handle.create(owner, IslandType::Classic).await.unwrap();
    let marathon = ChallengeId::new("marathon");
    let rounds = 100;

    handle
        .increment_progress(owner, island.id, &marathon, 1)
        .await
        .unwrap();
    for _ in 0..rounds {
        handle
            .orchestrator()
            .evict_idle(Utc::now() + chrono::Duration::hours(1))
            .await;

        let writer = handle.clone();
        let reader = handle.clone();
        let challenge = marathon.clone();
        let read_challenge = marathon.clone();
        let increment = tokio::spawn(async move {
            writer
                .increment_progress(owner, island.id, &challenge, 1)
                .await
        });
        let read = tokio::spawn(async move {
            reader
                .get_progress(island.id, None, &read_challenge)
                .await
        });
        increment.await.unwrap().unwrap();
        read.await.unwrap().unwrap();
    }

    let progress = handle
        .get_progress(island.id, None, &marathon)
        .await
        .unwrap();
    assert_eq!(progress.current, rounds + 1);
}

#[tokio::test]
async fn test_queries_on_unloaded_island_do_not_fill_cache() {
    let (h, island, member) = island_with_member().await;
    let handle = h.runtime.handle();
    let builders = ChallengeId::new("builders");
    handle
        .increment_progress(island.owner, island.id, &builders, 4)
        .await
        .unwrap();
    handle
        .orchestrator()
        .evict_idle(Utc::now() + chrono::Duration::hours(1))
        .await;
    assert!(!handle.is_loaded(island.id));

    let progress = handle
        .get_progress(island.id, None, &builders)
        .await
        .unwrap();
    assert_eq!(progress.current, 4);
    let available = handle
        .available_challenges(island.id, member)
        .await
        .unwrap();
    assert!(available.iter().any(|c| c.id == builders));

    assert!(handle.orchestrator().progress_cache().is_empty());
}
