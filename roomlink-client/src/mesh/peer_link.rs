use crate::engine::{MediaEngine, MediaSession, SessionEvent, SignalingState};
use crate::error::{EngineError, Error, Result};
use crate::mesh::candidate_buffer::CandidateBuffer;
use crate::signaling::SignalingOutput;
use roomlink_core::{IceCandidate, PeerId, SessionDescription, SignalMessage};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Negotiation state of a single [`PeerLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
}

impl LinkState {
    /// True while an offer is outstanding in either direction.
    pub fn has_pending_offer(self) -> bool {
        matches!(self, LinkState::HaveLocalOffer | LinkState::HaveRemoteOffer)
    }

    /// Map the engine's signaling state back onto the link's view of it.
    fn derive(engine: SignalingState, remote_applied: bool) -> Self {
        match engine {
            SignalingState::Stable if remote_applied => LinkState::Stable,
            SignalingState::Stable => LinkState::Idle,
            SignalingState::HaveLocalOffer | SignalingState::HaveRemotePranswer => {
                LinkState::HaveLocalOffer
            }
            SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPranswer => {
                LinkState::HaveRemoteOffer
            }
            SignalingState::Closed => LinkState::Closed,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Idle => "idle",
            LinkState::HaveLocalOffer => "have-local-offer",
            LinkState::HaveRemoteOffer => "have-remote-offer",
            LinkState::Stable => "stable",
            LinkState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Glare tie-break. The side with the greater identifier yields.
pub fn is_polite(local: &PeerId, remote: &PeerId) -> bool {
    local > remote
}

/// What a link needs from the surrounding mesh to make progress.
pub struct LinkContext<'a> {
    pub local_id: &'a PeerId,
    pub engine: &'a dyn MediaEngine,
    pub signaling: &'a dyn SignalingOutput,
    pub session_events: &'a mpsc::Sender<SessionEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Answered,
    /// Impolite side of a glare; the remote offer was dropped.
    Ignored,
}

/// Negotiation with one remote peer.
pub struct PeerLink {
    peer: PeerId,
    state: LinkState,
    session: Option<Box<dyn MediaSession>>,
    candidates: CandidateBuffer,
    remote_applied: bool,
}

impl PeerLink {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            state: LinkState::Idle,
            session: None,
            candidates: CandidateBuffer::new(),
            remote_applied: false,
        }
    }

    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn buffered_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_applied
    }

    /// Send an offer to the peer. Only an idle link offers; otherwise this
    /// returns `Ok(false)` and nothing is sent.
    pub async fn initiate_offer(&mut self, ctx: &LinkContext<'_>) -> Result<bool> {
        if self.state != LinkState::Idle {
            debug!("Not offering to {}: link is already {}", self.peer, self.state);
            return Ok(false);
        }

        self.ensure_session(ctx).await?;
        let session = active(&self.session)?;

        let offer = session.create_offer().await?;
        if let Err(e) = session.set_local_description(offer.clone()).await {
            self.state = LinkState::derive(session.signaling_state(), self.remote_applied);
            return Err(e.into());
        }
        self.state = LinkState::HaveLocalOffer;

        ctx.signaling
            .send_signal(SignalMessage::Offer {
                offer,
                target: self.peer.clone(),
                sender: ctx.local_id.clone(),
            })
            .await?;

        info!("Sent offer to {}", self.peer);
        Ok(true)
    }

    /// Handle a remote offer, resolving glare first.
    pub async fn on_offer(
        &mut self,
        ctx: &LinkContext<'_>,
        offer: SessionDescription,
    ) -> Result<OfferOutcome> {
        if self.state == LinkState::Closed {
            return Err(Error::UnexpectedState {
                kind: "offer",
                peer: self.peer.clone(),
                state: self.state,
            });
        }

        let glare = self.state.has_pending_offer();
        if glare && !is_polite(ctx.local_id, &self.peer) {
            warn!("Glare with {}: keeping our offer, ignoring theirs", self.peer);
            return Ok(OfferOutcome::Ignored);
        }

        self.ensure_session(ctx).await?;
        let session = active(&self.session)?;

        if glare {
            if let Err(e) = session.rollback().await {
                self.state = LinkState::derive(session.signaling_state(), self.remote_applied);
                return Err(e.into());
            }
            self.state = LinkState::Idle;
            info!("Glare with {}: rolled back our offer", self.peer);
        }

        let had_remote = self.remote_applied;

        if let Err(e) = session.set_remote_description(offer).await {
            self.state = LinkState::derive(session.signaling_state(), had_remote);
            return Err(e.into());
        }
        self.state = LinkState::HaveRemoteOffer;
        self.remote_applied = true;

        let answer = match create_and_apply_answer(session).await {
            Ok(answer) => answer,
            Err(e) => {
                // Undo the remote offer so the link is left as it was.
                if let Err(undo) = session.rollback().await {
                    warn!("Could not undo offer from {}: {}", self.peer, undo);
                }
                self.remote_applied = had_remote;
                self.state = LinkState::derive(session.signaling_state(), had_remote);
                return Err(e.into());
            }
        };
        self.state = LinkState::Stable;

        let sent = ctx
            .signaling
            .send_signal(SignalMessage::Answer {
                answer,
                target: self.peer.clone(),
                sender: ctx.local_id.clone(),
            })
            .await;

        let applied = apply_buffered(session, &self.peer, self.candidates.drain()).await;
        if applied > 0 {
            debug!("Applied {} buffered candidates from {}", applied, self.peer);
        }

        sent?;
        info!("Answered offer from {}", self.peer);
        Ok(OfferOutcome::Answered)
    }

    /// Complete our own offer. Answers outside `HaveLocalOffer` are rejected
    /// without touching the session.
    pub async fn on_answer(&mut self, answer: SessionDescription) -> Result<()> {
        if self.state != LinkState::HaveLocalOffer {
            return Err(Error::UnexpectedState {
                kind: "answer",
                peer: self.peer.clone(),
                state: self.state,
            });
        }

        let session = active(&self.session)?;
        if let Err(e) = session.set_remote_description(answer).await {
            self.state = LinkState::derive(session.signaling_state(), self.remote_applied);
            return Err(e.into());
        }
        self.state = LinkState::Stable;
        self.remote_applied = true;

        let applied = apply_buffered(session, &self.peer, self.candidates.drain()).await;
        if applied > 0 {
            debug!("Applied {} buffered candidates from {}", applied, self.peer);
        }

        info!("Negotiation with {} is stable", self.peer);
        Ok(())
    }

    /// Apply a remote candidate, or hold it until a remote description is
    /// in place. A candidate the engine rejects is logged and dropped.
    pub async fn on_candidate(&mut self, candidate: IceCandidate) {
        if self.state == LinkState::Closed {
            debug!("Dropping candidate for closed link {}", self.peer);
            return;
        }

        let session = match self.session.as_deref() {
            Some(session) if self.remote_applied => session,
            _ => {
                self.candidates.push(candidate);
                debug!(
                    "Buffered candidate from {} ({} waiting)",
                    self.peer,
                    self.candidates.len()
                );
                return;
            }
        };

        if let Err(e) = session.add_ice_candidate(candidate).await {
            warn!("Dropping candidate from {}: {}", self.peer, e);
        }
    }

    /// Release the session. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }

        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("Closing session with {} failed: {}", self.peer, e);
            }
        }

        self.candidates.clear();
        self.state = LinkState::Closed;
        info!("Closed link with {}", self.peer);
    }

    async fn ensure_session(&mut self, ctx: &LinkContext<'_>) -> Result<()> {
        if self.session.is_none() {
            let session = ctx
                .engine
                .create_session(&self.peer, ctx.session_events.clone())
                .await?;
            self.session = Some(session);
        }
        Ok(())
    }
}

fn active(session: &Option<Box<dyn MediaSession>>) -> Result<&dyn MediaSession> {
    session
        .as_deref()
        .ok_or(Error::Engine(EngineError::Closed))
}

async fn create_and_apply_answer(
    session: &dyn MediaSession,
) -> Result<SessionDescription, EngineError> {
    let answer = session.create_answer().await?;
    session.set_local_description(answer.clone()).await?;
    Ok(answer)
}

/// Apply candidates in order. Each failure is logged and skipped.
async fn apply_buffered(
    session: &dyn MediaSession,
    peer: &PeerId,
    candidates: Vec<IceCandidate>,
) -> usize {
    let mut applied = 0;
    for candidate in candidates {
        match session.add_ice_candidate(candidate).await {
            Ok(()) => applied += 1,
            Err(e) => warn!("Dropping buffered candidate from {}: {}", peer, e),
        }
    }
    applied
}
