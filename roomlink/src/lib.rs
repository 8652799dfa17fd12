pub use roomlink_core::model::PeerId;

pub mod model {
    pub use roomlink_core::model::*;
    pub use roomlink_core::{CodecError, decode, encode};
}

#[cfg(feature = "client")]
pub mod client {
    pub use roomlink_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use roomlink_relay::*;
}
