//! Full-mesh negotiation for a room of peers.
//!
//! The [`Orchestrator`] actor owns one [`PeerLink`] per remote peer and
//! drives offer/answer exchange over a relay, resolving glare with the
//! polite/impolite rule. Media is delegated to a [`MediaEngine`]; the relay
//! connection to a [`SignalingOutput`].

mod config;
mod engine;
mod error;
mod mesh;
mod orchestrator;
mod signaling;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use mesh::*;
pub use orchestrator::*;
pub use signaling::*;

pub use roomlink_core::{
    IceCandidate, IceServerConfig, PeerId, RoomId, SessionDescription, SignalMessage,
};
