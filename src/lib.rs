//! Testwatch - watch-mode test runner supervision with editor state
//! reflection.
//!
//! The crate supervises a Jest-style test runner in watch mode, classifies
//! its mixed text/JSON stdout into typed events, multiplexes those events
//! over a typed bus, and reflects pass/fail state into editor-style sinks.

pub mod bus;
pub mod config;
pub mod display;
pub mod reflector;
pub mod runner;
pub mod supervisor;
