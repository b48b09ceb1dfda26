//! Idle-eviction worker.
//!
//! Ticks every `eviction_period` and runs one [`Orchestrator::evict_idle`]
//! pass per tick. Passes can also be requested on demand.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::lifecycle::{EvictionReport, Orchestrator};

pub enum EvictionCommand {
    /// Run a pass now and report what it did.
    SweepNow {
        reply: oneshot::Sender<EvictionReport>,
    },
    Shutdown,
}

pub struct EvictionWorker {
    orchestrator: Arc<Orchestrator>,
    period: Duration,
    command_rx: mpsc::Receiver<EvictionCommand>,
}

impl EvictionWorker {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        period: Duration,
        command_rx: mpsc::Receiver<EvictionCommand>,
    ) -> Self {
        Self {
            orchestrator,
            period,
            command_rx,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(EvictionCommand::SweepNow { reply }) => {
                        let report = self.sweep().await;
                        if reply.send(report).is_err() {
                            debug!("SweepNow reply channel closed (caller dropped)");
                        }
                    }
                    Some(EvictionCommand::Shutdown) | None => break,
                },
            }
        }
        debug!("Eviction worker stopped");
    }

    async fn sweep(&self) -> EvictionReport {
        let report = self.orchestrator.evict_idle(Utc::now()).await;
        if !report.evicted.is_empty() || !report.retained.is_empty() {
            debug!(
                "Eviction pass: {} evicted, {} retained, {} invitations pruned",
                report.evicted.len(),
                report.retained.len(),
                report.invitations_pruned
            );
        }
        report
    }
}
