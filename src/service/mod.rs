//! Network service
//!
//! The TCP listener, the per-connection session driver, a matching consumer,
//! and the service-level error and logging setup.

pub mod client;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;

pub use client::*;
pub use error::*;
pub use logging::*;
pub use server::*;
pub use session::*;
