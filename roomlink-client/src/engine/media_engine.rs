use crate::engine::SessionEvent;
use crate::error::EngineError;
use async_trait::async_trait;
use roomlink_core::{IceCandidate, PeerId, SessionDescription};
use std::fmt;
use tokio::sync::mpsc;

/// Offer/answer state as the media engine itself reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::HaveLocalPranswer => "have-local-pranswer",
            SignalingState::HaveRemotePranswer => "have-remote-pranswer",
            SignalingState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Factory for per-peer media sessions, all bound to the same local media.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Create a session toward `peer`. Local candidates and remote tracks
    /// are reported on `events`.
    async fn create_session(
        &self,
        peer: &PeerId,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn MediaSession>, EngineError>;
}

/// One media connection to one remote peer.
#[async_trait]
pub trait MediaSession: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError>;

    async fn create_answer(&self) -> Result<SessionDescription, EngineError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError>;

    /// Discard the pending offer, local or remote, returning to `stable`.
    /// Fails when nothing is pending.
    async fn rollback(&self) -> Result<(), EngineError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError>;

    fn signaling_state(&self) -> SignalingState;

    async fn close(&self) -> Result<(), EngineError>;
}
