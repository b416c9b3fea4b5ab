//! Runner module for process spawning and output classification.

mod demux;
mod events;
mod process;
mod stream;

pub use demux::*;
pub use events::*;
pub use process::*;
pub use stream::*;
