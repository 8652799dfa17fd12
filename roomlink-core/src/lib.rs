//! Wire model shared by the roomlink relay and its clients.

pub mod codec;
pub mod model;

pub use codec::{CodecError, decode, encode};
pub use model::*;
