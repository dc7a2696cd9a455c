//! Per-session playback settings and state

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::types::{validate_speed, ConfigValidationError, ReplayConfig};

/// Errors scoped to a single session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Speed factor is zero, negative or not finite
    #[error("invalid speed factor {0}: must be finite and greater than 0")]
    InvalidSpeed(f64),

    /// Session settings could not be derived from the service configuration
    #[error("invalid session configuration: {0}")]
    Configuration(#[from] ConfigValidationError),

    /// Writing to the peer failed
    #[error("write to peer failed: {0}")]
    Write(#[from] std::io::Error),

    /// A frame could not be serialized
    #[error("frame serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Set of dataset names a session replays; empty means every dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFilter(BTreeSet<String>);

impl DatasetFilter {
    /// Filter that lets everything through
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter restricted to `names`
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Whether records from `dataset` pass
    pub fn includes(&self, dataset: &str) -> bool {
        self.0.is_empty() || self.0.contains(dataset)
    }

    /// Whether the filter lets everything through
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }
}

/// Playback parameters for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    speed_factor: f64,
    loop_enabled: bool,
    dataset_filter: DatasetFilter,
    continuous_sequence: bool,
    pad_cycle: bool,
}

impl SessionSettings {
    /// Create settings, rejecting speed factors that are not finite and positive
    pub fn new(speed_factor: f64, loop_enabled: bool) -> Result<Self, SessionError> {
        validate_speed(speed_factor).map_err(|_| SessionError::InvalidSpeed(speed_factor))?;
        Ok(Self {
            speed_factor,
            loop_enabled,
            dataset_filter: DatasetFilter::all(),
            continuous_sequence: false,
            pad_cycle: false,
        })
    }

    /// Settings every session of a service starts from
    pub fn from_config(config: &ReplayConfig) -> Result<Self, SessionError> {
        let kinds = config.selected_datasets()?;
        let filter = DatasetFilter::from_names(kinds.iter().map(|kind| kind.canonical_name()));
        Ok(Self::new(config.speed, config.loop_enabled)?
            .with_filter(filter)
            .with_continuous_sequence(config.continuous_sequence)
            .with_padded_cycle(config.pad_cycle))
    }

    /// Restrict the session to a set of datasets
    pub fn with_filter(mut self, filter: DatasetFilter) -> Self {
        self.dataset_filter = filter;
        self
    }

    /// Keep counting sequence numbers across loops
    pub fn with_continuous_sequence(mut self, enabled: bool) -> Self {
        self.continuous_sequence = enabled;
        self
    }

    /// Pad each cycle with the smallest gap between records
    pub fn with_padded_cycle(mut self, enabled: bool) -> Self {
        self.pad_cycle = enabled;
        self
    }

    /// Real-time divisor applied to original gaps
    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// Whether the session restarts after the last record
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Datasets included in the session
    pub fn dataset_filter(&self) -> &DatasetFilter {
        &self.dataset_filter
    }

    /// Whether sequence numbers continue across loops
    pub fn continuous_sequence(&self) -> bool {
        self.continuous_sequence
    }

    /// Whether cycles are padded with the smallest gap
    pub fn pad_cycle(&self) -> bool {
        self.pad_cycle
    }
}

/// Lifecycle of a session.
///
/// `Starting -> Streaming -> (Looping -> Streaming)* -> Ended | Aborted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing emitted yet
    Starting,
    /// Emitting frames
    Streaming,
    /// Wrapped around to the start of the timeline
    Looping,
    /// Timeline exhausted without looping
    Ended,
    /// Stopped by a transport failure, disconnect or shutdown
    Aborted,
}

impl SessionState {
    /// Whether no further frames can be produced
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Starting => write!(f, "STARTING"),
            SessionState::Streaming => write!(f, "STREAMING"),
            SessionState::Looping => write!(f, "LOOPING"),
            SessionState::Ended => write!(f, "ENDED"),
            SessionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_validation() {
        assert!(SessionSettings::new(1.0, false).is_ok());
        assert!(SessionSettings::new(0.25, true).is_ok());
        for bad in [0.0, -3.0, f64::NAN, f64::NEG_INFINITY, f64::INFINITY] {
            assert!(matches!(SessionSettings::new(bad, false), Err(SessionError::InvalidSpeed(_))));
        }
    }

    #[test]
    fn test_filter() {
        let all = DatasetFilter::all();
        assert!(all.includes("anything"));
        assert!(all.is_unrestricted());

        let some = DatasetFilter::from_names(["POS_Transactions", "RFID_data"]);
        assert!(some.includes("RFID_data"));
        assert!(!some.includes("Queue_monitor"));
        assert!(!some.is_unrestricted());
    }

    #[test]
    fn test_settings_from_config() {
        let config = ReplayConfig {
            speed: 20.0,
            loop_enabled: true,
            datasets: vec!["rfid_readings".to_string()],
            continuous_sequence: true,
            ..Default::default()
        };
        let settings = SessionSettings::from_config(&config).unwrap();
        assert_eq!(settings.speed_factor(), 20.0);
        assert!(settings.loop_enabled());
        assert!(settings.continuous_sequence());
        assert!(!settings.pad_cycle());
        assert!(settings.dataset_filter().includes("RFID_data"));
        assert!(!settings.dataset_filter().includes("POS_Transactions"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Ended.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
        assert!(!SessionState::Looping.is_terminal());
        assert_eq!(SessionState::Aborted.to_string(), "ABORTED");
    }
}
