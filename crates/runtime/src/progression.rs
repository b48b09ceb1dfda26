//! Progression engine: challenge progress, prerequisites and rewards.
//!
//! Every increment runs under the island's entry lock, so a completion and
//! its reward happen exactly once. Changed records are written through to the
//! store and then cached until the island is evicted or deleted, which also
//! happens under that lock. Reads never fill the cache, so a record read from
//! the store can never overwrite a newer cached one.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use island_core::{
    ChallengeDefinition, ChallengeId, ChallengeProgress, ChallengeRegistry, ChallengeScope,
    IslandId, PlayerId, ProgressKey, ProgressStep,
};
use tracing::{info, warn};

use crate::api::{IslandError, Notice, Result};
use crate::events::ProgressionEvent;
use crate::lifecycle::Orchestrator;

/// Cached progress records of loaded islands.
#[derive(Default)]
pub struct ProgressCache {
    records: DashMap<ProgressKey, ChallengeProgress>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ProgressKey) -> Option<ChallengeProgress> {
        self.records.get(key).map(|p| p.clone())
    }

    pub fn put(&self, progress: ChallengeProgress) {
        self.records.insert(progress.key.clone(), progress);
    }

    pub fn island_records(&self, island: IslandId) -> Vec<ChallengeProgress> {
        self.records
            .iter()
            .filter(|p| p.key.island == island)
            .map(|p| p.value().clone())
            .collect()
    }

    /// Drops every cached record of an island.
    pub fn forget_island(&self, island: IslandId) -> usize {
        let before = self.records.len();
        self.records.retain(|key, _| key.island != island);
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct ProgressionEngine {
    registry: Arc<ChallengeRegistry>,
    cache: Arc<ProgressCache>,
    orchestrator: Arc<Orchestrator>,
}

impl ProgressionEngine {
    pub fn new(
        registry: Arc<ChallengeRegistry>,
        cache: Arc<ProgressCache>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            registry,
            cache,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &Arc<ChallengeRegistry> {
        &self.registry
    }

    fn definition(&self, challenge: &ChallengeId) -> Result<&ChallengeDefinition> {
        self.registry
            .get(challenge)
            .ok_or_else(|| IslandError::ChallengeNotFound(challenge.clone()))
    }

    /// Current progress, from the cache, then the store, then a fresh zero
    /// record (not persisted until it first changes). Nothing is cached here.
    pub async fn get_progress(
        &self,
        island: IslandId,
        player: Option<PlayerId>,
        challenge: &ChallengeId,
    ) -> Result<ChallengeProgress> {
        let key = self.definition(challenge)?.key(island, player);
        self.resolve(key).await
    }

    async fn resolve(&self, key: ProgressKey) -> Result<ChallengeProgress> {
        if let Some(progress) = self.cache.get(&key) {
            return Ok(progress);
        }
        let store = self.orchestrator.store();
        Ok(store
            .load_progress(&key)
            .await?
            .unwrap_or_else(|| ChallengeProgress::new(key)))
    }

    /// Adds `amount` to a challenge. Reaching the target completes it,
    /// credits the reward to the island, and notifies the player (player
    /// scope) or every member (island scope).
    pub async fn increment_progress(
        &self,
        player: PlayerId,
        island: IslandId,
        challenge: &ChallengeId,
        amount: u64,
    ) -> Result<ProgressStep> {
        let definition = self.definition(challenge)?;
        let mut guard = self.orchestrator.lock_loaded(island).await?;
        let store = self.orchestrator.store();

        let before = self.resolve(definition.key(island, Some(player))).await?;
        let mut progress = before.clone();
        let step = progress.advance(amount, definition.target, Utc::now());

        match step {
            ProgressStep::Unchanged => return Ok(step),
            ProgressStep::Advanced { current } => {
                store.save_progress(&progress).await?;
                self.cache.put(progress.clone());
                self.orchestrator
                    .events()
                    .publish(ProgressionEvent::ProgressAdvanced {
                        island,
                        player: progress.key.player,
                        challenge: challenge.clone(),
                        current,
                        target: definition.target,
                    });
                return Ok(step);
            }
            ProgressStep::Completed { .. } => {}
        }

        // Completion is recorded before the reward: a record that says
        // "completed" can never pay out twice.
        store.save_progress(&progress).await?;
        let reward = definition.reward;
        let credited = self
            .orchestrator
            .commit(&mut guard, |island| {
                island.add_tokens(reward);
                Ok(())
            })
            .await;
        if let Err(err) = credited {
            warn!(
                "Reward for {} on island {} not saved; reverting completion",
                challenge, island
            );
            let _ = store.save_progress(&before).await;
            return Err(err);
        }
        self.cache.put(progress.clone());
        drop(guard);

        info!(
            "Challenge {} completed on island {} ({} tokens)",
            challenge, island, reward
        );
        let recipients = match definition.scope {
            ChallengeScope::Player => vec![player],
            ChallengeScope::Island => self.island_members(island, player).await,
        };
        self.orchestrator.notifier().notify(
            &recipients,
            &Notice::ChallengeCompleted {
                challenge: challenge.clone(),
                name: definition.name.clone(),
                reward,
            },
        );
        self.orchestrator
            .events()
            .publish(ProgressionEvent::ChallengeCompleted {
                island,
                player: progress.key.player,
                challenge: challenge.clone(),
                reward,
            });

        Ok(step)
    }

    /// Every member of an island, falling back to the acting player if the
    /// member list cannot be read.
    async fn island_members(&self, island: IslandId, player: PlayerId) -> Vec<PlayerId> {
        match self.orchestrator.members(island).await {
            Ok(members) if !members.is_empty() => {
                members.into_iter().map(|m| m.player_id).collect()
            }
            _ => vec![player],
        }
    }

    /// Whether every direct prerequisite is completed, each resolved with its
    /// own scope. Vacuously true for a challenge without prerequisites.
    pub async fn are_prerequisites_satisfied(
        &self,
        island: IslandId,
        player: PlayerId,
        challenge: &ChallengeId,
    ) -> Result<bool> {
        let definition = self.definition(challenge)?;
        for prerequisite in &definition.prerequisites {
            let progress = self.get_progress(island, Some(player), prerequisite).await?;
            if !progress.completed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Challenges the player can work on now: not completed, prerequisites met.
    pub async fn available_challenges(
        &self,
        island: IslandId,
        player: PlayerId,
    ) -> Result<Vec<ChallengeDefinition>> {
        let mut available = Vec::new();
        for definition in self.registry.iter() {
            let progress = self.get_progress(island, Some(player), &definition.id).await?;
            if progress.completed {
                continue;
            }
            if self
                .are_prerequisites_satisfied(island, player, &definition.id)
                .await?
            {
                available.push(definition.clone());
            }
        }
        Ok(available)
    }

    /// Feeds a metric into every unlocked challenge that counts it.
    ///
    /// Unlock state is taken before any progress is applied, so an amount
    /// that completes a prerequisite does not also count toward the
    /// challenges it unlocks.
    pub async fn record_metric(
        &self,
        player: PlayerId,
        island: IslandId,
        metric: &str,
        amount: u64,
    ) -> Result<Vec<(ChallengeId, ProgressStep)>> {
        let mut unlocked = Vec::new();
        for definition in self.registry.by_metric(metric) {
            if self
                .are_prerequisites_satisfied(island, player, &definition.id)
                .await?
            {
                unlocked.push(definition);
            }
        }

        let mut steps = Vec::new();
        for definition in unlocked {
            let step = self
                .increment_progress(player, island, &definition.id, amount)
                .await?;
            if step != ProgressStep::Unchanged {
                steps.push((definition.id.clone(), step));
            }
        }
        Ok(steps)
    }
}
