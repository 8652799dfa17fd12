use crate::engine::{MediaEngine, SessionEvent};
use crate::error::Error;
use crate::mesh::peer_link::{LinkContext, LinkState, PeerLink};
use crate::mesh::readiness_gate::ReadinessGate;
use crate::orchestrator::MeshEvent;
use crate::signaling::SignalingOutput;
use roomlink_core::{PeerId, RoomId, SignalMessage};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Handles the mesh shares with every link it drives.
pub(crate) struct MeshIo {
    pub engine: Arc<dyn MediaEngine>,
    pub signaling: Arc<dyn SignalingOutput>,
    pub session_tx: mpsc::Sender<SessionEvent>,
    pub events: mpsc::UnboundedSender<MeshEvent>,
}

impl MeshIo {
    pub fn context<'a>(&'a self, local_id: &'a PeerId) -> LinkContext<'a> {
        LinkContext {
            local_id,
            engine: self.engine.as_ref(),
            signaling: self.signaling.as_ref(),
            session_events: &self.session_tx,
        }
    }

    pub fn emit(&self, event: MeshEvent) {
        if self.events.send(event).is_err() {
            debug!("No one is listening for mesh events");
        }
    }

    pub async fn send(&self, msg: SignalMessage) {
        let kind = msg.kind();
        if let Err(e) = self.signaling.send_signal(msg).await {
            error!("Failed to send {} to relay: {}", kind, e);
        }
    }
}

/// Everything known about the local client's membership in a room: its
/// identity, the readiness gate and one link per remote peer.
///
/// The coordinator half lives in `coordinator_impl.rs`, the inbound
/// dispatch in `router_impl.rs`.
pub struct Mesh {
    pub(crate) io: MeshIo,
    pub(crate) local_id: Option<PeerId>,
    pub(crate) room: Option<RoomId>,
    pub(crate) gate: ReadinessGate,
    pub(crate) links: HashMap<PeerId, PeerLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub buffered_candidates: usize,
}

/// Point-in-time view of a [`Mesh`], mostly for tests and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSnapshot {
    pub local_id: Option<PeerId>,
    pub room: Option<RoomId>,
    pub ready: bool,
    pub pending_messages: usize,
    pub pending_peers: Vec<PeerId>,
    pub links: BTreeMap<PeerId, LinkSnapshot>,
}

impl MeshSnapshot {
    pub fn link_state(&self, peer: &PeerId) -> Option<LinkState> {
        self.links.get(peer).map(|l| l.state)
    }
}

impl Mesh {
    pub(crate) fn new(io: MeshIo) -> Self {
        Self {
            io,
            local_id: None,
            room: None,
            gate: ReadinessGate::new(),
            links: HashMap::new(),
        }
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    pub fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot {
            local_id: self.local_id.clone(),
            room: self.room.clone(),
            ready: self.gate.is_ready(),
            pending_messages: self.gate.pending_message_count(),
            pending_peers: self.gate.pending_peers().to_vec(),
            links: self
                .links
                .iter()
                .map(|(peer, link)| {
                    (
                        peer.clone(),
                        LinkSnapshot {
                            state: link.state(),
                            buffered_candidates: link.buffered_candidates(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// React to something a media session raised on its own.
    pub async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CandidateGenerated(peer, candidate) => {
                let Some(local) = self.local_id.clone() else {
                    debug!("Dropping local candidate for {}: no identity", peer);
                    return;
                };
                if !self.links.contains_key(&peer) {
                    debug!("Dropping local candidate for departed peer {}", peer);
                    return;
                }
                self.io
                    .send(SignalMessage::Candidate {
                        candidate,
                        target: peer,
                        sender: local,
                    })
                    .await;
            }
            SessionEvent::RemoteTrack(peer, track) => {
                if !self.links.contains_key(&peer) {
                    return;
                }
                info!("Remote {:?} track {} from {}", track.kind, track.track_id, peer);
                self.io.emit(MeshEvent::RemoteTrack { peer, track });
            }
            SessionEvent::Disconnected(peer) => {
                info!("Media connection with {} went down", peer);
            }
        }
    }

    pub(crate) fn log_failure(peer: &PeerId, err: &Error) {
        match err {
            Error::UnexpectedState { .. } => warn!("Ignoring message: {}", err),
            _ => error!("Negotiation with {} failed: {}", peer, err),
        }
    }
}
