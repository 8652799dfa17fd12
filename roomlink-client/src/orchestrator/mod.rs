mod mesh_command;
mod mesh_event;
mod mesh_handle;
mod orchestrator;

pub use mesh_command::*;
pub use mesh_event::*;
pub use mesh_handle::*;
pub use orchestrator::*;
