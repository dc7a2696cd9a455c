//! Dataset loading
//!
//! Turns the configured dataset identifiers into per-dataset record sequences.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use sentinel_event_stream::dataset::DatasetLoader;
//! use sentinel_event_stream::types::DatasetKind;
//!
//! let loader = DatasetLoader::new("data/input");
//! let sources = loader.select(&[DatasetKind::PosTransactions])?;
//! let datasets = loader.load_all(&sources)?;
//! println!("{} records", datasets[0].records.len());
//! # Ok::<(), sentinel_event_stream::dataset::LoadError>(())
//! ```

pub mod loader;

pub use loader::*;
