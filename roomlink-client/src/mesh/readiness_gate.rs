use roomlink_core::{PeerId, SignalMessage};
use std::collections::VecDeque;

/// What was held back while local media was not ready.
#[derive(Debug, Default)]
pub struct Backlog {
    /// Inbound messages in arrival order.
    pub messages: Vec<SignalMessage>,
    /// Peers that still need an offer from us.
    pub peers: Vec<PeerId>,
}

/// Holds inbound signaling and outbound offer intents until local media
/// has been captured. Once opened it stays open for the rest of the room
/// session.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: bool,
    pending_messages: VecDeque<SignalMessage>,
    pending_peers: Vec<PeerId>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Hand back `msg` if it may be processed now, otherwise queue it.
    pub fn submit(&mut self, msg: SignalMessage) -> Option<SignalMessage> {
        if self.ready {
            return Some(msg);
        }
        self.pending_messages.push_back(msg);
        None
    }

    /// Remember that `peer` needs an offer. Returns false if it was already
    /// remembered.
    pub fn defer_peer(&mut self, peer: PeerId) -> bool {
        if self.pending_peers.contains(&peer) {
            return false;
        }
        self.pending_peers.push(peer);
        true
    }

    /// Drop a deferred peer. Returns false if it was not deferred.
    pub fn forget_peer(&mut self, peer: &PeerId) -> bool {
        let before = self.pending_peers.len();
        self.pending_peers.retain(|p| p != peer);
        self.pending_peers.len() != before
    }

    /// Open the gate. The first call returns everything that was held back;
    /// later calls return `None`.
    pub fn mark_ready(&mut self) -> Option<Backlog> {
        if self.ready {
            return None;
        }
        self.ready = true;

        Some(Backlog {
            messages: self.pending_messages.drain(..).collect(),
            peers: std::mem::take(&mut self.pending_peers),
        })
    }

    /// Close the gate and drop anything held, for the next room session.
    pub fn reset(&mut self) {
        self.ready = false;
        self.pending_messages.clear();
        self.pending_peers.clear();
    }

    pub fn pending_message_count(&self) -> usize {
        self.pending_messages.len()
    }

    pub fn pending_peers(&self) -> &[PeerId] {
        &self.pending_peers
    }
}
