pub mod mock_engine;

pub use mock_engine::*;
pub use mock_signaling::*;
pub use signal_helpers::*;
