mod description;
mod ice;
mod peer;
mod room;
mod signaling;

pub use description::{SdpKind, SessionDescription};
pub use ice::{IceCandidate, IceServerConfig};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::SignalMessage;
