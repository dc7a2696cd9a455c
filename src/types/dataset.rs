//! Dataset catalog
//!
//! The set of feeds the service knows how to replay is closed: every dataset
//! identifier is resolved to a [`DatasetKind`] at startup, and each kind carries
//! its own normalizer. Nothing is looked up by name per record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::record::{RecordError, SourceRecord};
use super::timestamp::EventTimestamp;

/// Known source datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Point-of-sale transactions
    PosTransactions,
    /// RFID reader events
    RfidReadings,
    /// Checkout queue monitoring
    QueueMonitoring,
    /// Vision-based product recognition
    ProductRecognition,
    /// Inventory snapshots
    InventorySnapshots,
}

impl DatasetKind {
    /// Every kind, in catalog order
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::PosTransactions,
        DatasetKind::RfidReadings,
        DatasetKind::QueueMonitoring,
        DatasetKind::ProductRecognition,
        DatasetKind::InventorySnapshots,
    ];

    /// Name reported on the wire
    pub fn canonical_name(self) -> &'static str {
        match self {
            DatasetKind::PosTransactions => "POS_Transactions",
            DatasetKind::RfidReadings => "RFID_data",
            DatasetKind::QueueMonitoring => "Queue_monitor",
            DatasetKind::ProductRecognition => "Product_recognism",
            DatasetKind::InventorySnapshots => "Current_inventory_data",
        }
    }

    /// File stem under the data root
    pub fn file_stem(self) -> &'static str {
        match self {
            DatasetKind::PosTransactions => "pos_transactions",
            DatasetKind::RfidReadings => "rfid_readings",
            DatasetKind::QueueMonitoring => "queue_monitoring",
            DatasetKind::ProductRecognition => "product_recognition",
            DatasetKind::InventorySnapshots => "inventory_snapshots",
        }
    }

    /// Field holding the record's timestamp
    pub fn timestamp_field(self) -> &'static str {
        match self {
            DatasetKind::PosTransactions
            | DatasetKind::RfidReadings
            | DatasetKind::QueueMonitoring
            | DatasetKind::ProductRecognition
            | DatasetKind::InventorySnapshots => "timestamp",
        }
    }

    /// Resolve a canonical name or file stem
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let identifier = identifier.trim().trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|kind| kind.canonical_name() == identifier || kind.file_stem() == identifier)
    }

    /// All accepted identifiers, for error messages
    pub fn available_identifiers() -> Vec<String> {
        Self::ALL.iter().map(|kind| kind.canonical_name().to_string()).collect()
    }

    /// Normalize one parsed JSON value into a [`SourceRecord`].
    ///
    /// The payload is kept verbatim; only the timestamp is extracted.
    pub fn normalize(self, source_name: &Arc<str>, value: Value) -> Result<SourceRecord, RecordError> {
        let Value::Object(_) = value else {
            return Err(RecordError::NotAnObject);
        };

        let field = self.timestamp_field();
        let timestamp = match value.get(field) {
            Some(Value::String(text)) => EventTimestamp::parse(text)?,
            Some(_) => return Err(RecordError::NonStringTimestamp(field)),
            None => return Err(RecordError::MissingTimestamp(field)),
        };

        Ok(SourceRecord::new(Arc::clone(source_name), timestamp, value))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_identifier(s).ok_or_else(|| format!("Unknown dataset: {}", s))
    }
}
