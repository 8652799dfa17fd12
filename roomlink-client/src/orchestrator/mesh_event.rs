use crate::engine::RemoteTrackInfo;
use roomlink_core::{PeerId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Requested,
    TransportClosed,
}

/// Notifications for the application driving the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// A join request for `room` went out to the relay.
    Connected { room: RoomId },

    /// Offer/answer with `peer` completed.
    LinkStable { peer: PeerId },

    RemoteTrack { peer: PeerId, track: RemoteTrackInfo },

    PeerLeft { peer: PeerId },

    /// Every link is closed.
    Left { reason: LeaveReason },
}
