//! Configuration loading for the watch supervisor.

mod loader;
mod types;

pub use loader::*;
pub use types::*;
