//! Source timestamps
//!
//! Datasets declare their timestamps as ISO-8601 text, sometimes with an offset
//! and sometimes without. [`EventTimestamp`] keeps the verbatim source text next
//! to the parsed instant so that unshifted timestamps go back on the wire
//! exactly as they were read.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Naive layouts accepted when the text carries no offset
const NAIVE_FORMATS: [&str; 4] =
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Offset layouts RFC 3339 rejects: `+0200` style offsets, a space separator
/// or minutes-only precision
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// A parsed source timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTimestamp {
    /// Absolute point in time; naive sources are read as UTC
    instant: DateTime<FixedOffset>,
    /// Whether the source text declared an offset
    has_offset: bool,
    /// Text exactly as it appeared in the source
    raw: String,
}

/// Error returned when a timestamp string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to parse timestamp '{0}' as ISO-8601")]
pub struct TimestampParseError(pub String);

impl EventTimestamp {
    /// Parse an ISO-8601 timestamp
    pub fn parse(text: &str) -> Result<Self, TimestampParseError> {
        let trimmed = text.trim();

        let with_offset = DateTime::parse_from_rfc3339(trimmed).ok().or_else(|| {
            OFFSET_FORMATS.iter().find_map(|format| DateTime::parse_from_str(trimmed, format).ok())
        });
        if let Some(instant) = with_offset {
            return Ok(Self { instant, has_offset: true, raw: text.to_string() });
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| TimestampParseError(text.to_string()))?;

        Ok(Self { instant: naive.and_utc().fixed_offset(), has_offset: false, raw: text.to_string() })
    }

    /// The absolute instant used for ordering and pacing
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    /// Whether the source declared an explicit offset
    pub fn has_offset(&self) -> bool {
        self.has_offset
    }

    /// The verbatim source text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Signed distance from `earlier` to this timestamp
    pub fn since(&self, earlier: &EventTimestamp) -> Duration {
        self.instant.signed_duration_since(earlier.instant)
    }

    /// Move the timestamp forward by `shift`.
    ///
    /// A zero shift returns the timestamp untouched, source text included.
    /// Returns `None` when the result leaves chrono's representable range.
    pub fn shifted(&self, shift: Duration) -> Option<Self> {
        if shift.is_zero() {
            return Some(self.clone());
        }
        let instant = self.instant.checked_add_signed(shift)?;
        let raw = render_iso(instant, self.has_offset);
        Some(Self { instant, has_offset: self.has_offset, raw })
    }
}

impl fmt::Display for EventTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Render like Python's `isoformat()`: microseconds only when non-zero,
/// offset only when the source had one.
fn render_iso(instant: DateTime<FixedOffset>, with_offset: bool) -> String {
    let mut text = instant.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = instant.nanosecond() / 1_000;
    if micros != 0 {
        text.push_str(&format!(".{:06}", micros));
    }
    if with_offset {
        text.push_str(&instant.format("%:z").to_string());
    }
    text
}
