use axum::extract::ws::Message;
use dashmap::DashMap;
use roomlink_core::{PeerId, RoomId, SignalMessage, encode};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct Connection {
    tx: mpsc::UnboundedSender<Message>,
    room: Option<RoomId>,
}

struct RelayInner {
    peers: DashMap<PeerId, Connection>,
    rooms: DashMap<RoomId, HashSet<PeerId>>,
}

/// Connection and room registry shared by every socket task.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                rooms: DashMap::new(),
            }),
        }
    }

    /// Register a socket's outbound queue under a fresh id and greet it
    /// with `init`.
    pub fn register(&self, tx: mpsc::UnboundedSender<Message>) -> PeerId {
        let id = PeerId::new();
        self.inner
            .peers
            .insert(id.clone(), Connection { tx, room: None });
        self.send_to(&id, &SignalMessage::Init { id: id.clone() });
        id
    }

    /// Apply one message received from `peer`.
    pub fn handle(&self, peer: &PeerId, mut msg: SignalMessage) {
        if msg.target().is_some() {
            msg.stamp_sender(peer);
            self.forward(peer, &msg);
            return;
        }

        match &msg {
            SignalMessage::Join { room: Some(room), .. } => self.join(peer, room.clone()),
            SignalMessage::Join { room: None, .. } => {
                warn!("Join without a room from {}", peer);
            }
            SignalMessage::Bye { .. } => self.leave_room(peer),
            _ => debug!("Ignoring {} from {}", msg.kind(), peer),
        }
    }

    /// Forget a closed socket, telling its room it left.
    pub fn disconnect(&self, peer: &PeerId) {
        self.leave_room(peer);
        self.inner.peers.remove(peer);
    }

    pub fn room_of(&self, peer: &PeerId) -> Option<RoomId> {
        self.inner.peers.get(peer).and_then(|c| c.room.clone())
    }

    pub fn members(&self, room: &RoomId) -> Vec<PeerId> {
        self.inner
            .rooms
            .get(room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.peers.len()
    }

    fn join(&self, peer: &PeerId, room: RoomId) {
        if self.room_of(peer).as_ref() == Some(&room) {
            debug!("{} is already in room {}", peer, room);
            return;
        }
        self.leave_room(peer);

        // Read the current members and insert under one entry guard, so two
        // concurrent joiners always see each other.
        let others: Vec<PeerId> = {
            let mut members = self.inner.rooms.entry(room.clone()).or_default();
            let others = members.iter().cloned().collect();
            members.insert(peer.clone());
            others
        };
        if let Some(mut conn) = self.inner.peers.get_mut(peer) {
            conn.room = Some(room.clone());
        }

        info!("{} joined room {} ({} already there)", peer, room, others.len());
        let notice = SignalMessage::Join {
            room: Some(room),
            id: Some(peer.clone()),
        };
        for other in &others {
            self.send_to(other, &notice);
        }
    }

    fn leave_room(&self, peer: &PeerId) {
        let room = match self.inner.peers.get_mut(peer) {
            Some(mut conn) => conn.room.take(),
            None => None,
        };
        let Some(room) = room else {
            return;
        };

        let emptied = match self.inner.rooms.get_mut(&room) {
            Some(mut members) => {
                members.remove(peer);
                members.is_empty()
            }
            None => false,
        };
        if emptied {
            self.inner.rooms.remove_if(&room, |_, members| members.is_empty());
            debug!("Room {} is now empty", room);
        }

        info!("{} left room {}", peer, room);
        let bye = SignalMessage::Bye {
            sender: Some(peer.clone()),
        };
        for other in self.members(&room) {
            self.send_to(&other, &bye);
        }
    }

    fn forward(&self, from: &PeerId, msg: &SignalMessage) {
        let Some(target) = msg.target() else {
            return;
        };

        let room = self.room_of(from);
        if room.is_none() || self.room_of(target) != room {
            warn!(
                "Dropping {} from {} to {}: not in the same room",
                msg.kind(),
                from,
                target
            );
            return;
        }

        debug!("Forwarding {} from {} to {}", msg.kind(), from, target);
        self.send_to(target, msg);
    }

    fn send_to(&self, peer: &PeerId, msg: &SignalMessage) {
        let json = match encode(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {}: {}", msg.kind(), e);
                return;
            }
        };

        if let Some(conn) = self.inner.peers.get(peer) {
            if let Err(e) = conn.tx.send(Message::Text(json.into())) {
                error!("Failed to queue message for {}: {}", peer, e);
            }
        } else {
            warn!("Attempted to send {} to disconnected peer {}", msg.kind(), peer);
        }
    }
}
