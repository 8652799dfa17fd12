mod media_engine;
mod session_event;
mod webrtc_engine;

pub use media_engine::*;
pub use session_event::*;
pub use webrtc_engine::*;
