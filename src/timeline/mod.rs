//! Timeline merging
//!
//! Builds the immutable, globally ordered [`MergedTimeline`] that every replay
//! session reads from.

pub mod merger;

pub use merger::*;
