use crate::error::Error;
use crate::mesh::mesh::Mesh;
use crate::mesh::peer_link::PeerLink;
use crate::orchestrator::{LeaveReason, MeshEvent};
use roomlink_core::{PeerId, RoomId, SignalMessage};
use tracing::{debug, info, warn};

impl Mesh {
    /// Ask the relay to place us in `room`. Leaves the current room first
    /// if there is one.
    pub async fn connect(&mut self, room: RoomId) {
        if self.room.is_some() {
            self.leave().await;
        }

        info!("Joining room {}", room);
        self.room = Some(room.clone());
        self.io
            .send(SignalMessage::Join {
                room: Some(room.clone()),
                id: None,
            })
            .await;
        self.io.emit(MeshEvent::Connected { room });
    }

    /// Adopt the relay-assigned identity. It is fixed for the life of the
    /// connection, so any later `init` is ignored.
    pub(crate) fn assign_identity(&mut self, id: PeerId) {
        match &self.local_id {
            Some(current) if *current != id => {
                warn!("Ignoring init for {}: already identified as {}", id, current);
            }
            Some(_) => debug!("Ignoring repeated init for {}", id),
            None => {
                info!("Relay assigned identity {}", id);
                self.local_id = Some(id);
            }
        }
    }

    /// Local media is captured. Replays everything that was held back: the
    /// queued messages first, in arrival order, then offers to deferred
    /// peers.
    pub async fn mark_local_media_ready(&mut self) {
        let Some(backlog) = self.gate.mark_ready() else {
            debug!("Local media was already marked ready");
            return;
        };

        info!(
            "Local media ready: replaying {} messages, {} deferred peers",
            backlog.messages.len(),
            backlog.peers.len()
        );

        for msg in backlog.messages {
            self.route(msg).await;
        }
        for peer in backlog.peers {
            self.on_peer_joined(peer).await;
        }
    }

    /// A peer entered the room, announced by either `join` or `new-peer`.
    pub(crate) async fn on_peer_joined(&mut self, peer: PeerId) {
        if self.local_id.as_ref() == Some(&peer) {
            debug!("Ignoring our own join notification");
            return;
        }

        self.initiate(peer).await;
    }

    async fn initiate(&mut self, peer: PeerId) {
        let Some(local) = self.local_id.clone() else {
            Mesh::log_failure(&peer, &Error::Unidentified);
            return;
        };

        info!("Peer {} joined, sending offer", peer);
        let ctx = self.io.context(&local);
        let link = self
            .links
            .entry(peer.clone())
            .or_insert_with(|| PeerLink::new(peer.clone()));

        if let Err(e) = link.initiate_offer(&ctx).await {
            Mesh::log_failure(&peer, &e);
        }
    }

    /// A peer left. Tears down its link if there is one.
    pub(crate) async fn on_bye(&mut self, peer: &PeerId) {
        let Some(mut link) = self.links.remove(peer) else {
            debug!("Bye from {} with no link, nothing to close", peer);
            return;
        };

        link.close().await;
        info!("Peer {} left", peer);
        self.io.emit(MeshEvent::PeerLeft { peer: peer.clone() });
    }

    /// Leave the room: say goodbye, close every link and close the gate
    /// for the next session. The relay identity is kept.
    pub async fn leave(&mut self) {
        if self.room.is_none() && self.links.is_empty() {
            debug!("Leave requested while not in a room");
            return;
        }

        if let Some(local) = self.local_id.clone() {
            self.io
                .send(SignalMessage::Bye {
                    sender: Some(local),
                })
                .await;
        }

        self.teardown().await;
        info!("Left room");
        self.io.emit(MeshEvent::Left {
            reason: LeaveReason::Requested,
        });
    }

    /// The relay connection is gone. Nothing can be sent any more, so the
    /// links are closed silently and the identity is forgotten.
    pub async fn transport_closed(&mut self) {
        self.teardown().await;
        self.local_id = None;
        warn!("Signaling transport closed, mesh torn down");
        self.io.emit(MeshEvent::Left {
            reason: LeaveReason::TransportClosed,
        });
    }

    pub(crate) async fn teardown(&mut self) {
        for (_, mut link) in std::mem::take(&mut self.links) {
            link.close().await;
        }
        self.gate.reset();
        self.room = None;
    }
}
