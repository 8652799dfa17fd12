use crate::error::Error;
use crate::mesh::mesh::Mesh;
use crate::mesh::peer_link::{OfferOutcome, PeerLink};
use crate::orchestrator::MeshEvent;
use roomlink_core::{IceCandidate, PeerId, SessionDescription, SignalMessage, decode};
use tracing::{debug, warn};

impl Mesh {
    /// Entry point for raw relay frames. Malformed input is logged and
    /// dropped.
    pub async fn submit_inbound_text(&mut self, text: &str) {
        match decode(text) {
            Ok(msg) => self.submit(msg).await,
            Err(e) => warn!("Discarding inbound message: {}", e),
        }
    }

    /// Pass a message through the readiness gate. Before local media is
    /// ready, membership notices only update the deferred peer list; every
    /// other message is queued.
    pub async fn submit(&mut self, msg: SignalMessage) {
        if !self.gate.is_ready() {
            match &msg {
                SignalMessage::Join { id: Some(peer), .. }
                | SignalMessage::NewPeer { id: peer } => {
                    if self.gate.defer_peer(peer.clone()) {
                        debug!("Deferring offer to {} until local media is ready", peer);
                    }
                    return;
                }
                // No link exists before the gate opens, so a departure only
                // cancels the deferred offer.
                SignalMessage::Bye { sender: Some(peer) } => {
                    if self.gate.forget_peer(peer) {
                        debug!("{} left before we could offer", peer);
                    }
                    return;
                }
                _ => {}
            }
        }

        match self.gate.submit(msg) {
            Some(msg) => self.route(msg).await,
            None => debug!(
                "Local media not ready, queued message ({} waiting)",
                self.gate.pending_message_count()
            ),
        }
    }

    /// Dispatch a message by kind.
    pub(crate) async fn route(&mut self, msg: SignalMessage) {
        if let (Some(target), Some(local)) = (msg.target(), self.local_id.as_ref()) {
            if target != local {
                warn!("Discarding {} addressed to {}, not us", msg.kind(), target);
                return;
            }
        }

        match msg {
            SignalMessage::Init { id } => self.assign_identity(id),
            SignalMessage::Join { id: Some(id), .. } | SignalMessage::NewPeer { id } => {
                self.on_peer_joined(id).await
            }
            SignalMessage::Join { id: None, .. } => {
                debug!("Discarding join without a peer id");
            }
            SignalMessage::Offer { offer, sender, .. } => self.on_offer(sender, offer).await,
            SignalMessage::Answer { answer, sender, .. } => self.on_answer(sender, answer).await,
            SignalMessage::Candidate {
                candidate, sender, ..
            } => self.on_candidate(sender, candidate).await,
            SignalMessage::Bye { sender: Some(peer) } => self.on_bye(&peer).await,
            SignalMessage::Bye { sender: None } => {
                debug!("Discarding bye without a sender");
            }
            SignalMessage::Unknown => debug!("Discarding message of unknown kind"),
        }
    }

    async fn on_offer(&mut self, sender: PeerId, offer: SessionDescription) {
        let Some(local) = self.local_id.clone() else {
            Mesh::log_failure(&sender, &Error::Unidentified);
            return;
        };
        if sender == local {
            debug!("Discarding offer from ourselves");
            return;
        }

        let ctx = self.io.context(&local);
        let link = self
            .links
            .entry(sender.clone())
            .or_insert_with(|| PeerLink::new(sender.clone()));

        match link.on_offer(&ctx, offer).await {
            Ok(OfferOutcome::Answered) => self.io.emit(MeshEvent::LinkStable { peer: sender }),
            Ok(OfferOutcome::Ignored) => {}
            Err(e) => Mesh::log_failure(&sender, &e),
        }
    }

    async fn on_answer(&mut self, sender: PeerId, answer: SessionDescription) {
        let Some(link) = self.links.get_mut(&sender) else {
            debug!("Discarding answer from unknown peer {}", sender);
            return;
        };

        match link.on_answer(answer).await {
            Ok(()) => self.io.emit(MeshEvent::LinkStable { peer: sender }),
            Err(e) => Mesh::log_failure(&sender, &e),
        }
    }

    async fn on_candidate(&mut self, sender: PeerId, candidate: IceCandidate) {
        let Some(link) = self.links.get_mut(&sender) else {
            debug!("Discarding candidate from unknown peer {}", sender);
            return;
        };

        link.on_candidate(candidate).await;
    }
}
