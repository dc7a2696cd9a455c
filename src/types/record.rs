//! Normalized source records

use serde_json::Value;
use std::sync::Arc;

use super::timestamp::{EventTimestamp, TimestampParseError};

/// One record from one dataset.
///
/// Immutable once created; the payload is passed through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    source_name: Arc<str>,
    original_timestamp: EventTimestamp,
    payload: Value,
}

impl SourceRecord {
    /// Create a new record
    pub fn new(source_name: Arc<str>, original_timestamp: EventTimestamp, payload: Value) -> Self {
        Self { source_name, original_timestamp, payload }
    }

    /// Name of the dataset this record came from
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Timestamp as declared by the source
    pub fn original_timestamp(&self) -> &EventTimestamp {
        &self.original_timestamp
    }

    /// Opaque structured payload
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Reasons a single input line or element is rejected
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The text is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The JSON value is not an object
    #[error("record is not a JSON object")]
    NotAnObject,

    /// The timestamp field is absent
    #[error("missing '{0}' field")]
    MissingTimestamp(&'static str),

    /// The timestamp field is present but not a string
    #[error("'{0}' field is not a string")]
    NonStringTimestamp(&'static str),

    /// The timestamp string could not be parsed
    #[error(transparent)]
    InvalidTimestamp(#[from] TimestampParseError),
}
