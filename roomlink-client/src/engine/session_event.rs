use roomlink_core::{IceCandidate, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

/// Description of a track received from a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackInfo {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

/// Events a media session raises outside of any offer/answer call.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A local candidate was gathered and must be trickled to the peer.
    CandidateGenerated(PeerId, IceCandidate),

    /// The peer started sending a track.
    RemoteTrack(PeerId, RemoteTrackInfo),

    /// The underlying connection failed or was closed.
    Disconnected(PeerId),
}
