//! Supervisor module for runner lifecycle and event dispatch.

mod session;
mod watch;

pub use session::*;
pub use watch::*;
