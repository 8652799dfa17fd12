use crate::config::ClientConfig;
use crate::engine::{MediaEngine, SessionEvent};
use crate::mesh::{Mesh, MeshIo};
use crate::orchestrator::{MeshCommand, MeshEvent, MeshHandle};
use crate::signaling::SignalingOutput;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Actor that owns the [`Mesh`] and serializes everything that touches it:
/// application commands, relay messages and media session events.
pub struct Orchestrator {
    mesh: Mesh,
    command_rx: mpsc::Receiver<MeshCommand>,
    session_rx: mpsc::Receiver<SessionEvent>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        signaling: Arc<dyn SignalingOutput>,
        config: &ClientConfig,
    ) -> (Self, MeshHandle, mpsc::UnboundedReceiver<MeshEvent>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (session_tx, session_rx) = mpsc::channel(config.session_event_capacity);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mesh = Mesh::new(MeshIo {
            engine,
            signaling,
            session_tx,
            events: event_tx,
        });

        let orchestrator = Self {
            mesh,
            command_rx,
            session_rx,
        };

        (orchestrator, MeshHandle::new(command_tx), event_rx)
    }

    /// Spawn the actor on the current runtime.
    pub fn spawn(
        engine: Arc<dyn MediaEngine>,
        signaling: Arc<dyn SignalingOutput>,
        config: &ClientConfig,
    ) -> (MeshHandle, mpsc::UnboundedReceiver<MeshEvent>) {
        let (orchestrator, handle, events) = Self::new(engine, signaling, config);
        tokio::spawn(orchestrator.run());
        (handle, events)
    }

    pub async fn run(mut self) {
        info!("Mesh orchestrator started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All mesh handles dropped. Shutting down.");
                            break;
                        }
                    }
                }

                evt = self.session_rx.recv() => {
                    match evt {
                        Some(e) => self.mesh.handle_session_event(e).await,
                        None => {
                            warn!("Session event channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        self.mesh.teardown().await;
        info!("Mesh orchestrator finished");
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::Connect { room } => self.mesh.connect(room).await,
            MeshCommand::LocalMediaReady => self.mesh.mark_local_media_ready().await,
            MeshCommand::Inbound(text) => self.mesh.submit_inbound_text(&text).await,
            MeshCommand::Signal(msg) => self.mesh.submit(msg).await,
            MeshCommand::Leave => self.mesh.leave().await,
            MeshCommand::TransportClosed => self.mesh.transport_closed().await,
            MeshCommand::Snapshot { reply } => {
                let _ = reply.send(self.mesh.snapshot());
            }
        }
    }
}
