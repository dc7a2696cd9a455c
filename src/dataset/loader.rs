//! Dataset loading
//!
//! Resolves dataset files under the data root and parses them into
//! [`SourceRecord`] sequences. A bad line is logged and skipped; a dataset
//! that yields nothing at all is fatal.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::types::{DatasetKind, RecordError, SourceRecord};

/// File extensions tried for each dataset, most preferred first
const EXTENSIONS: [&str; 2] = ["jsonl", "json"];

/// Dataset loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Data root does not exist
    #[error("Data directory not found: {0}")]
    DataRootNotFound(String),

    /// Requested dataset has no file under the data root
    #[error("Dataset file for {dataset} not found. Tried: {}", .tried.join(", "))]
    DatasetNotFound {
        /// Dataset that was requested
        dataset: DatasetKind,
        /// Paths that were tried
        tried: Vec<String>,
    },

    /// No dataset files at all under the data root
    #[error("No dataset files found to stream under {0}")]
    NoDatasets(String),

    /// Dataset file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Dataset produced zero usable records
    #[error("Dataset {dataset} ({path}) contained no valid records ({skipped} skipped)")]
    NoRecords {
        /// Dataset that came up empty
        dataset: DatasetKind,
        /// File that was read
        path: String,
        /// Number of rejected lines or elements
        skipped: usize,
    },
}

/// A dataset file selected for loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    /// Catalog entry
    pub kind: DatasetKind,
    /// File to read
    pub path: PathBuf,
}

/// A rejected line or element
#[derive(Debug)]
pub struct SkippedRecord {
    /// 1-based line number for line-delimited files, element index otherwise
    pub position: usize,
    /// Why it was rejected
    pub error: RecordError,
}

/// Records parsed from one dataset
#[derive(Debug)]
pub struct LoadedDataset {
    /// Catalog entry
    pub kind: DatasetKind,
    /// Source file
    pub path: PathBuf,
    /// Accepted records in input order
    pub records: Vec<SourceRecord>,
    /// Rejected entries
    pub skipped: Vec<SkippedRecord>,
}

impl LoadedDataset {
    /// Name used on the wire
    pub fn name(&self) -> &'static str {
        self.kind.canonical_name()
    }
}

/// Loads datasets from a directory
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    data_root: PathBuf,
}

impl DatasetLoader {
    /// Create a loader rooted at `data_root`
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into() }
    }

    /// Directory datasets are read from
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Select the files to load.
    ///
    /// With an explicit selection every entry must have a file. With an empty
    /// selection every catalog dataset present under the root is used, in
    /// catalog order.
    pub fn select(&self, selection: &[DatasetKind]) -> Result<Vec<DatasetSource>, LoadError> {
        if !self.data_root.is_dir() {
            return Err(LoadError::DataRootNotFound(self.data_root.display().to_string()));
        }

        if selection.is_empty() {
            self.discover()
        } else {
            selection.iter().map(|kind| self.resolve(*kind)).collect()
        }
    }

    /// Locate the file for one dataset, preferring `.jsonl` over `.json`
    pub fn resolve(&self, kind: DatasetKind) -> Result<DatasetSource, LoadError> {
        let candidates = self.candidates(kind);
        candidates
            .iter()
            .find(|path| path.is_file())
            .map(|path| DatasetSource { kind, path: path.clone() })
            .ok_or_else(|| LoadError::DatasetNotFound {
                dataset: kind,
                tried: candidates.iter().map(|p| p.display().to_string()).collect(),
            })
    }

    /// Every catalog dataset that has a file under the root
    pub fn discover(&self) -> Result<Vec<DatasetSource>, LoadError> {
        let sources: Vec<DatasetSource> =
            DatasetKind::ALL.iter().filter_map(|kind| self.resolve(*kind).ok()).collect();

        if let Ok(entries) = fs::read_dir(&self.data_root) {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_dataset_file = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext));
                if is_dataset_file && !sources.iter().any(|source| source.path == path) {
                    debug!("Ignoring {} (not a known dataset)", path.display());
                }
            }
        }

        if sources.is_empty() {
            return Err(LoadError::NoDatasets(self.data_root.display().to_string()));
        }
        Ok(sources)
    }

    /// Read and parse one dataset file
    #[instrument(skip(self), fields(dataset = %source.kind))]
    pub fn load(&self, source: &DatasetSource) -> Result<LoadedDataset, LoadError> {
        let content = fs::read(&source.path).map_err(|error| LoadError::Io {
            path: source.path.display().to_string(),
            source: error,
        })?;

        let (records, skipped) = parse_records(source.kind, &content);

        for entry in &skipped {
            warn!(
                dataset = %source.kind,
                path = %source.path.display(),
                position = entry.position,
                "Skipping malformed record: {}",
                entry.error
            );
        }

        if records.is_empty() {
            return Err(LoadError::NoRecords {
                dataset: source.kind,
                path: source.path.display().to_string(),
                skipped: skipped.len(),
            });
        }

        info!(
            "Loaded {} records from {} ({} skipped)",
            records.len(),
            source.path.display(),
            skipped.len()
        );

        Ok(LoadedDataset { kind: source.kind, path: source.path.clone(), records, skipped })
    }

    /// Load every selected source, failing on the first fatal error
    pub fn load_all(&self, sources: &[DatasetSource]) -> Result<Vec<LoadedDataset>, LoadError> {
        sources.iter().map(|source| self.load(source)).collect()
    }

    fn candidates(&self, kind: DatasetKind) -> Vec<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.data_root.join(format!("{}.{}", kind.file_stem(), ext)))
            .collect()
    }
}

/// Parse the contents of one dataset file.
///
/// The whole file is first tried as one JSON document: a list of records, an
/// object with an `events` list, or a single record. Anything else is read as
/// newline-delimited JSON, one record per non-blank line. Lines are decoded
/// independently, so invalid UTF-8 only costs the line it appears on.
pub fn parse_records(kind: DatasetKind, content: &[u8]) -> (Vec<SourceRecord>, Vec<SkippedRecord>) {
    let source_name: Arc<str> = Arc::from(kind.canonical_name());
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    let mut accept = |position: usize, value: Result<Value, RecordError>| {
        match value.and_then(|value| kind.normalize(&source_name, value)) {
            Ok(record) => records.push(record),
            Err(error) => skipped.push(SkippedRecord { position, error }),
        }
    };

    match serde_json::from_slice::<Value>(content) {
        Ok(Value::Array(items)) => {
            for (index, item) in items.into_iter().enumerate() {
                accept(index + 1, Ok(item));
            }
        }
        Ok(Value::Object(mut object)) => match object.remove("events") {
            Some(Value::Array(items)) => {
                for (index, item) in items.into_iter().enumerate() {
                    accept(index + 1, Ok(item));
                }
            }
            other => {
                if let Some(value) = other {
                    object.insert("events".to_string(), value);
                }
                accept(1, Ok(Value::Object(object)));
            }
        },
        Ok(other) => accept(1, Ok(other)),
        Err(_) => {
            for (index, line) in content.split(|byte| *byte == b'\n').enumerate() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let value = std::str::from_utf8(line)
                    .map_err(RecordError::from)
                    .and_then(|text| serde_json::from_str::<Value>(text).map_err(RecordError::from));
                accept(index + 1, value);
            }
        }
    }

    (records, skipped)
}
