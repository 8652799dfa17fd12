use crate::error::{Error, Result};
use crate::mesh::MeshSnapshot;
use crate::orchestrator::MeshCommand;
use roomlink_core::{RoomId, SignalMessage};
use tokio::sync::{mpsc, oneshot};

/// Cloneable front door to a running [`Orchestrator`](crate::Orchestrator).
///
/// Every call only enqueues a command; the actor processes them one at a
/// time in the order they were sent.
#[derive(Debug, Clone)]
pub struct MeshHandle {
    tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub(crate) fn new(tx: mpsc::Sender<MeshCommand>) -> Self {
        Self { tx }
    }

    pub async fn connect(&self, room: impl Into<RoomId>) -> Result<()> {
        self.send(MeshCommand::Connect { room: room.into() }).await
    }

    pub async fn mark_local_media_ready(&self) -> Result<()> {
        self.send(MeshCommand::LocalMediaReady).await
    }

    pub async fn submit_inbound_message(&self, text: impl Into<String>) -> Result<()> {
        self.send(MeshCommand::Inbound(text.into())).await
    }

    pub async fn submit_signal(&self, msg: SignalMessage) -> Result<()> {
        self.send(MeshCommand::Signal(msg)).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.send(MeshCommand::Leave).await
    }

    pub async fn transport_closed(&self) -> Result<()> {
        self.send(MeshCommand::TransportClosed).await
    }

    /// Wait for every earlier command to be processed, then report state.
    pub async fn snapshot(&self) -> Result<MeshSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(MeshCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::Shutdown)
    }

    async fn send(&self, cmd: MeshCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| Error::Shutdown)
    }
}
