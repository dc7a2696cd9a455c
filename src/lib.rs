//! Sentinel Event Stream
//!
//! Replays recorded retail sensor feeds (point-of-sale, RFID, queue monitoring,
//! product recognition and inventory snapshots) as one chronological stream of
//! newline-delimited JSON over TCP, so detection systems can be developed
//! against realistic, repeatable traffic.
//!
//! # Overview
//!
//! Datasets are loaded once at startup and merged into a single immutable
//! timeline. Every client connection then gets its own independent replay of
//! that timeline: its own cursor, sequence numbers and pacing, scaled by a
//! speed factor and optionally looping forever with timestamps rebased onto
//! each new cycle.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_event_stream::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let record = |ts: &str| {
//!     SourceRecord::new(Arc::from("RFID_data"), EventTimestamp::parse(ts).unwrap(), json!({"timestamp": ts}))
//! };
//! let timeline = MergedTimeline::merge(vec![(
//!     "RFID_data".to_string(),
//!     vec![record("2025-08-13T16:00:00"), record("2025-08-13T16:00:04")],
//! )])?;
//!
//! let settings = SessionSettings::new(2.0, false)?;
//! let mut scheduler = ReplayScheduler::new(Arc::new(timeline), settings);
//! assert_eq!(scheduler.banner("demo").events, 2);
//!
//! let first = scheduler.plan_next().unwrap();
//! let second = scheduler.plan_next().unwrap();
//! assert_eq!((first.sequence, second.sequence), (1, 2));
//! assert_eq!(second.due, std::time::Duration::from_secs(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Timestamps, records, the dataset catalog and configuration
//! - [`dataset`]: Locating and parsing dataset files
//! - [`timeline`]: Merging datasets into one ordered timeline
//! - [`replay`]: Per-session scheduling, state and wire frames
//! - [`service`]: TCP listener, session driver, client, errors and logging
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Dataset   │    │  Timeline   │    │   Replay    │
//! │             │    │             │    │             │
//! │ Catalog     ├───►│ k-way merge ├───►│ Scheduler   │
//! │ Parsing     │    │ Window span │    │ Frames      │
//! └─────────────┘    └─────────────┘    └──────┬──────┘
//!                                              │ one per connection
//!                                       ┌──────▼──────┐
//!                                       │   Service   │
//!                                       │ TCP server  │
//!                                       │ Sessions    │
//!                                       └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod dataset;
pub mod replay;
pub mod service;
pub mod timeline;
pub mod types;

// Core types and configuration
pub use types::{
    CliArgs, ConfigError, ConfigValidationError, DatasetKind, EventTimestamp, RecordError,
    ReplayConfig, SessionId, SourceRecord,
};

// Loading and merging
pub use dataset::{DatasetLoader, LoadError, LoadedDataset};
pub use timeline::{MergedTimeline, TimelineError};

// Replay
pub use replay::{
    Banner, DatasetFilter, EmittedFrame, ReceivedFrame, ReplayScheduler, SessionError,
    SessionSettings, SessionState,
};

// Service
pub use service::{
    prepare_timeline, run_session, LoggingConfig, ReplayServer, ServiceError, SessionSummary,
    StreamClient,
};
