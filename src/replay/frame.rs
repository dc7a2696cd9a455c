//! Wire messages
//!
//! Every session starts with one [`Banner`] line followed by one line per
//! [`EmittedFrame`]. Both are serialized as single-line JSON objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EventTimestamp, SourceRecord};

/// Description of the stream sent first on every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    /// Service name
    pub service: String,
    /// Datasets included in this session
    pub datasets: Vec<String>,
    /// Records per cycle after filtering
    pub events: usize,
    /// Whether the session loops
    #[serde(rename = "loop")]
    pub loop_enabled: bool,
    /// Replay speed multiplier
    pub speed_factor: f64,
    /// Length of one cycle in timeline seconds
    pub cycle_seconds: f64,
    /// Description of the framing
    #[serde(default)]
    pub schema: String,
}

/// Framing description carried in the banner
pub const SCHEMA_DESCRIPTION: &str = "newline-delimited JSON objects";

/// One replayed record
#[derive(Debug, Clone)]
pub struct EmittedFrame<'a> {
    /// Record being replayed
    pub record: &'a SourceRecord,
    /// Session-local sequence number
    pub sequence: u64,
    /// Loop iteration this frame belongs to, starting at 0
    pub loop_index: u64,
    /// Original timestamp shifted forward by whole cycles
    pub adjusted_timestamp: EventTimestamp,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    dataset: &'a str,
    sequence: u64,
    timestamp: &'a str,
    original_timestamp: &'a str,
    event: &'a Value,
}

impl EmittedFrame<'_> {
    /// Dataset the record came from
    pub fn dataset(&self) -> &str {
        self.record.source_name()
    }

    /// Serialize as one JSON line, newline included
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let line = FrameLine {
            dataset: self.record.source_name(),
            sequence: self.sequence,
            timestamp: self.adjusted_timestamp.raw(),
            original_timestamp: self.record.original_timestamp().raw(),
            event: self.record.payload(),
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl Banner {
    /// Serialize as one JSON line, newline included
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// A frame as read back by a consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedFrame {
    /// Dataset name
    pub dataset: String,
    /// Session-local sequence number
    pub sequence: u64,
    /// Adjusted timestamp
    pub timestamp: String,
    /// Original timestamp, verbatim
    pub original_timestamp: String,
    /// Verbatim payload
    pub event: Value,
}
