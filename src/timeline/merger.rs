//! Timeline merging
//!
//! Combines per-dataset record sequences into one [`MergedTimeline`] ordered by
//! timestamp. Equal timestamps keep the declared dataset order first and the
//! input order within a dataset second, so identical inputs always produce an
//! identical timeline.

use chrono::{DateTime, Duration, FixedOffset};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, info};

use crate::dataset::LoadedDataset;
use crate::types::SourceRecord;

/// Timeline construction errors
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Nothing to merge
    #[error("No events found across provided datasets")]
    Empty,
}

/// The single time-ordered sequence shared read-only by every session
#[derive(Debug, Clone)]
pub struct MergedTimeline {
    records: Vec<SourceRecord>,
    dataset_names: Vec<String>,
    window_start: DateTime<FixedOffset>,
    window_span: Duration,
    min_positive_gap: Option<Duration>,
}

impl MergedTimeline {
    /// Merge loaded datasets in their declared order
    pub fn from_datasets(datasets: Vec<LoadedDataset>) -> Result<Self, TimelineError> {
        Self::merge(
            datasets
                .into_iter()
                .map(|dataset| (dataset.name().to_string(), dataset.records))
                .collect(),
        )
    }

    /// Merge named record sequences.
    ///
    /// The position of each sequence in `sources` is its tie-break rank.
    pub fn merge(sources: Vec<(String, Vec<SourceRecord>)>) -> Result<Self, TimelineError> {
        let total: usize = sources.iter().map(|(_, records)| records.len()).sum();
        if total == 0 {
            return Err(TimelineError::Empty);
        }

        let mut dataset_names = Vec::with_capacity(sources.len());
        let mut streams = Vec::with_capacity(sources.len());
        for (name, mut records) in sources {
            // Stable, so equal timestamps keep their input order
            records.sort_by_key(|record| record.original_timestamp().instant());
            dataset_names.push(name);
            streams.push(records.into_iter().peekable());
        }

        let mut heap = BinaryHeap::with_capacity(streams.len());
        for (rank, stream) in streams.iter_mut().enumerate() {
            if let Some(head) = stream.peek() {
                heap.push(Reverse((head.original_timestamp().instant(), rank)));
            }
        }

        let mut records = Vec::with_capacity(total);
        while let Some(Reverse((_, rank))) = heap.pop() {
            let stream = &mut streams[rank];
            if let Some(record) = stream.next() {
                records.push(record);
            }
            if let Some(head) = stream.peek() {
                heap.push(Reverse((head.original_timestamp().instant(), rank)));
            }
        }

        let window_start = records[0].original_timestamp().instant();
        let window_end = records[records.len() - 1].original_timestamp().instant();
        let window_span = window_end.signed_duration_since(window_start);
        let min_positive_gap = records
            .windows(2)
            .map(|pair| pair[1].original_timestamp().since(pair[0].original_timestamp()))
            .filter(|gap| *gap > Duration::zero())
            .min();

        info!(
            "Merged {} events from {} dataset(s) spanning {}s",
            records.len(),
            dataset_names.len(),
            window_span.num_milliseconds() as f64 / 1000.0
        );
        debug!("Timeline starts at {}", window_start);

        Ok(Self { records, dataset_names, window_start, window_span, min_positive_gap })
    }

    /// All records in replay order
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the timeline is empty (never true for a built timeline)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dataset names in declared order
    pub fn dataset_names(&self) -> &[String] {
        &self.dataset_names
    }

    /// Timestamp of the first record
    pub fn window_start(&self) -> DateTime<FixedOffset> {
        self.window_start
    }

    /// Duration from the first to the last record
    pub fn window_span(&self) -> Duration {
        self.window_span
    }

    /// Smallest strictly positive gap between consecutive records
    pub fn min_positive_gap(&self) -> Option<Duration> {
        self.min_positive_gap
    }

    /// Offset of a record from the window start
    pub fn offset_of(&self, record: &SourceRecord) -> Duration {
        record.original_timestamp().instant().signed_duration_since(self.window_start)
    }

    /// Amount each loop iteration is shifted forward by.
    ///
    /// Equals the window span, plus the smallest gap when `pad` is set, and is
    /// never shorter than one second.
    pub fn cycle_span(&self, pad: bool) -> Duration {
        let mut span = self.window_span;
        if pad {
            span = span + self.min_positive_gap.unwrap_or_else(|| Duration::seconds(1));
        }
        if span <= Duration::zero() {
            span = Duration::seconds(1);
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventTimestamp;
    use serde_json::json;
    use std::sync::Arc;

    fn record(source: &str, ts: &str, n: u32) -> SourceRecord {
        SourceRecord::new(
            Arc::from(source),
            EventTimestamp::parse(ts).unwrap(),
            json!({"timestamp": ts, "n": n}),
        )
    }

    fn order(timeline: &MergedTimeline) -> Vec<(String, u64)> {
        timeline
            .records()
            .iter()
            .map(|r| (r.source_name().to_string(), r.payload()["n"].as_u64().unwrap()))
            .collect()
    }

    #[test]
    fn test_merge_orders_by_timestamp() {
        let a = vec![record("A", "2025-01-01T00:00:00", 1), record("A", "2025-01-01T00:00:05", 2)];
        let b = vec![record("B", "2025-01-01T00:00:02", 1)];

        let timeline = MergedTimeline::merge(vec![("A".into(), a), ("B".into(), b)]).unwrap();

        assert_eq!(
            order(&timeline),
            vec![("A".to_string(), 1), ("B".to_string(), 1), ("A".to_string(), 2)]
        );
        assert_eq!(timeline.window_span(), Duration::seconds(5));
        assert_eq!(timeline.min_positive_gap(), Some(Duration::seconds(2)));
        assert_eq!(timeline.dataset_names(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_ties_follow_dataset_then_input_order() {
        let a = vec![record("A", "2025-01-01T00:00:01", 1), record("A", "2025-01-01T00:00:01", 2)];
        let b = vec![record("B", "2025-01-01T00:00:01", 1), record("B", "2025-01-01T00:00:00", 2)];

        let timeline = MergedTimeline::merge(vec![("B".into(), b), ("A".into(), a)]).unwrap();

        assert_eq!(
            order(&timeline),
            vec![
                ("B".to_string(), 2),
                ("B".to_string(), 1),
                ("A".to_string(), 1),
                ("A".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_merge_is_deterministic_and_non_decreasing() {
        let build = || {
            let a: Vec<_> = (0..50)
                .map(|i| record("A", &format!("2025-01-01T00:{:02}:{:02}", (i * 7) % 60, i % 60), i))
                .collect();
            let b: Vec<_> = (0..50)
                .map(|i| record("B", &format!("2025-01-01T00:{:02}:{:02}", (i * 11) % 60, (i * 3) % 60), i))
                .collect();
            MergedTimeline::merge(vec![("A".into(), a), ("B".into(), b)]).unwrap()
        };

        let first = build();
        let second = build();
        assert_eq!(order(&first), order(&second));

        for pair in first.records().windows(2) {
            assert!(pair[0].original_timestamp().instant() <= pair[1].original_timestamp().instant());
        }
        assert_eq!(first.len(), 100);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(MergedTimeline::merge(vec![]), Err(TimelineError::Empty)));
        assert!(matches!(
            MergedTimeline::merge(vec![("A".into(), vec![])]),
            Err(TimelineError::Empty)
        ));
    }

    #[test]
    fn test_cycle_span() {
        let a = vec![record("A", "2025-01-01T00:00:00", 1), record("A", "2025-01-01T00:00:05", 2)];
        let b = vec![record("B", "2025-01-01T00:00:02", 1)];
        let timeline = MergedTimeline::merge(vec![("A".into(), a), ("B".into(), b)]).unwrap();

        assert_eq!(timeline.cycle_span(false), Duration::seconds(5));
        assert_eq!(timeline.cycle_span(true), Duration::seconds(7));

        let single = MergedTimeline::merge(vec![(
            "A".into(),
            vec![record("A", "2025-01-01T00:00:00", 1)],
        )])
        .unwrap();
        assert_eq!(single.window_span(), Duration::zero());
        assert_eq!(single.cycle_span(false), Duration::seconds(1));
        assert_eq!(single.cycle_span(true), Duration::seconds(1));
    }
}
