//! Realm worker: the single mutation context for realm work.
//!
//! Owns the [`RealmBackend`] and processes [`RealmCommand`]s one at a time in
//! arrival order. Everything else in the runtime reaches the backend through
//! a cloneable [`RealmChannel`].

use std::sync::Arc;

use island_core::{IslandId, Location, PlayerId};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::api::{
    Destination, IslandError, RealmBackend, RealmError, RealmHandle, RealmSpec, TeleportKind,
};

type Reply<T> = oneshot::Sender<Result<T, RealmError>>;

/// Commands that can be sent to the realm worker
pub enum RealmCommand {
    Provision {
        spec: RealmSpec,
        reply: Reply<RealmHandle>,
    },
    Load {
        island: IslandId,
        reply: Reply<Option<RealmHandle>>,
    },
    Unload {
        island: IslandId,
        reply: Reply<bool>,
    },
    Delete {
        island: IslandId,
        reply: Reply<()>,
    },
    SetBoundary {
        island: IslandId,
        size: u32,
        reply: Reply<()>,
    },
    IsReady {
        island: IslandId,
        location: Location,
        reply: oneshot::Sender<bool>,
    },
    RealmOf {
        player: PlayerId,
        reply: oneshot::Sender<Option<String>>,
    },
    MovePlayer {
        player: PlayerId,
        destination: Destination,
        kind: TeleportKind,
        reply: Reply<()>,
    },
    FallbackLocation {
        reply: oneshot::Sender<Destination>,
    },
    /// Stop after the commands already queued.
    Shutdown,
}

/// Background task that serializes every realm backend call.
pub struct RealmWorker {
    backend: Arc<dyn RealmBackend>,
    command_rx: mpsc::Receiver<RealmCommand>,
}

impl RealmWorker {
    pub fn new(backend: Arc<dyn RealmBackend>, command_rx: mpsc::Receiver<RealmCommand>) -> Self {
        Self {
            backend,
            command_rx,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            if matches!(cmd, RealmCommand::Shutdown) {
                debug!("Realm worker shutting down");
                break;
            }
            self.handle_command(cmd).await;
        }
    }

    async fn handle_command(&self, cmd: RealmCommand) {
        let backend = self.backend.as_ref();
        let delivered = match cmd {
            RealmCommand::Provision { spec, reply } => {
                reply.send(backend.provision(&spec).await).is_ok()
            }
            RealmCommand::Load { island, reply } => reply.send(backend.load(island).await).is_ok(),
            RealmCommand::Unload { island, reply } => {
                reply.send(backend.unload(island).await).is_ok()
            }
            RealmCommand::Delete { island, reply } => {
                reply.send(backend.delete(island).await).is_ok()
            }
            RealmCommand::SetBoundary {
                island,
                size,
                reply,
            } => reply.send(backend.set_boundary(island, size).await).is_ok(),
            RealmCommand::IsReady {
                island,
                location,
                reply,
            } => reply.send(backend.is_ready(island, &location).await).is_ok(),
            RealmCommand::RealmOf { player, reply } => {
                reply.send(backend.realm_of(player).await).is_ok()
            }
            RealmCommand::MovePlayer {
                player,
                destination,
                kind,
                reply,
            } => reply
                .send(backend.move_player(player, &destination, kind).await)
                .is_ok(),
            RealmCommand::FallbackLocation { reply } => {
                reply.send(backend.fallback_location()).is_ok()
            }
            RealmCommand::Shutdown => true,
        };

        if !delivered {
            debug!("Realm command reply channel closed (caller dropped)");
        }
    }
}

/// Cloneable sender side of the realm worker.
#[derive(Clone)]
pub struct RealmChannel {
    command_tx: mpsc::Sender<RealmCommand>,
}

impl RealmChannel {
    pub fn new(command_tx: mpsc::Sender<RealmCommand>) -> Self {
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RealmCommand,
    ) -> Result<T, IslandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| IslandError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| IslandError::WorkerUnavailable)
    }

    pub async fn provision(&self, spec: RealmSpec) -> Result<RealmHandle, IslandError> {
        Ok(self
            .request(|reply| RealmCommand::Provision { spec, reply })
            .await??)
    }

    pub async fn load(&self, island: IslandId) -> Result<Option<RealmHandle>, IslandError> {
        Ok(self
            .request(|reply| RealmCommand::Load { island, reply })
            .await??)
    }

    pub async fn unload(&self, island: IslandId) -> Result<bool, IslandError> {
        Ok(self
            .request(|reply| RealmCommand::Unload { island, reply })
            .await??)
    }

    pub async fn delete(&self, island: IslandId) -> Result<(), IslandError> {
        Ok(self
            .request(|reply| RealmCommand::Delete { island, reply })
            .await??)
    }

    pub async fn set_boundary(&self, island: IslandId, size: u32) -> Result<(), IslandError> {
        Ok(self
            .request(|reply| RealmCommand::SetBoundary {
                island,
                size,
                reply,
            })
            .await??)
    }

    pub async fn is_ready(&self, island: IslandId, location: Location) -> Result<bool, IslandError> {
        self.request(|reply| RealmCommand::IsReady {
            island,
            location,
            reply,
        })
        .await
    }

    pub async fn realm_of(&self, player: PlayerId) -> Result<Option<String>, IslandError> {
        self.request(|reply| RealmCommand::RealmOf { player, reply })
            .await
    }

    pub async fn move_player(
        &self,
        player: PlayerId,
        destination: Destination,
        kind: TeleportKind,
    ) -> Result<(), IslandError> {
        Ok(self
            .request(|reply| RealmCommand::MovePlayer {
                player,
                destination,
                kind,
                reply,
            })
            .await??)
    }

    pub async fn fallback_location(&self) -> Result<Destination, IslandError> {
        self.request(|reply| RealmCommand::FallbackLocation { reply })
            .await
    }

    /// Asks the worker to stop; a no-op if it already has.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(RealmCommand::Shutdown).await;
    }
}
