//! Core types for the event replay service
//!
//! This module contains the fundamental data types shared by the loader, the
//! timeline merger and the replay scheduler.
//!
//! # Overview
//!
//! - **Timestamps**: ISO-8601 source timestamps that remember their original text
//! - **Records**: Normalized `SourceRecord` values with an opaque payload
//! - **Datasets**: The closed catalog of replayable feeds
//! - **Identifiers**: UUID-based session identifiers
//! - **Configuration**: Service configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use sentinel_event_stream::types::*;
//!
//! let kind = DatasetKind::from_identifier("rfid_readings").unwrap();
//! assert_eq!(kind.canonical_name(), "RFID_data");
//!
//! let ts = EventTimestamp::parse("2025-08-13T16:00:00").unwrap();
//! assert_eq!(ts.raw(), "2025-08-13T16:00:00");
//!
//! let config = ReplayConfig { speed: 10.0, ..Default::default() };
//! assert!(!config.speed_outside_documented_range());
//! ```

pub mod config;
pub mod dataset;
pub mod identifiers;
pub mod record;
pub mod timestamp;

// Re-export all public types for convenience
pub use config::*;
pub use dataset::*;
pub use identifiers::*;
pub use record::*;
pub use timestamp::*;
