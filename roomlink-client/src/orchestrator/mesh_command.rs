use crate::mesh::MeshSnapshot;
use roomlink_core::{RoomId, SignalMessage};
use tokio::sync::oneshot;

/// Requests delivered to the orchestrator actor.
#[derive(Debug)]
pub enum MeshCommand {
    /// Join a room through the relay.
    Connect { room: RoomId },

    /// Local capture finished; release the readiness gate.
    LocalMediaReady,

    /// Raw text frame received from the relay.
    Inbound(String),

    /// Already decoded relay message.
    Signal(SignalMessage),

    Leave,

    /// The relay connection ended.
    TransportClosed,

    Snapshot { reply: oneshot::Sender<MeshSnapshot> },
}
