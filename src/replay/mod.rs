//! Replay engine
//!
//! Per-session scheduling over the shared timeline, the session state machine,
//! and the wire frames written to each consumer.

pub mod frame;
pub mod scheduler;
pub mod session;

pub use frame::*;
pub use scheduler::*;
pub use session::*;
