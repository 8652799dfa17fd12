mod candidate_buffer;
mod coordinator_impl;
mod mesh;
mod peer_link;
mod readiness_gate;
mod router_impl;

pub use candidate_buffer::*;
pub use mesh::*;
pub use peer_link::*;
pub use readiness_gate::*;
