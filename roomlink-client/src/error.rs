use crate::engine::SignalingState;
use crate::mesh::LinkState;
use roomlink_core::{CodecError, PeerId};
use thiserror::Error;

/// Failures reported by a [`MediaSession`](crate::MediaSession).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{op} is not allowed in signaling state {state}")]
    InvalidState {
        op: &'static str,
        state: SignalingState,
    },

    #[error("session rejected the description: {0}")]
    InvalidDescription(String),

    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("media engine failure: {0}")]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("signaling transport failure: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("signaling transport is closed")]
    TransportClosed,

    #[error("local identity has not been assigned by the relay yet")]
    Unidentified,

    #[error("unexpected {kind} from {peer} while {state}")]
    UnexpectedState {
        kind: &'static str,
        peer: PeerId,
        state: LinkState,
    },

    #[error("mesh orchestrator has shut down")]
    Shutdown,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
