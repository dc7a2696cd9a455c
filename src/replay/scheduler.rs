//! Replay scheduling
//!
//! A [`ReplayScheduler`] walks the shared timeline for one session. It owns the
//! cursor, loop counter and sequence counter, converts each record's offset
//! from the window start into a wall-clock deadline scaled by the speed
//! factor, and sleeps until that deadline before handing out the frame.
//!
//! Deadlines are measured from the moment the session starts, never from the
//! previous frame, so a session that falls behind catches up without drifting.

use chrono::Duration;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::frame::{Banner, EmittedFrame, SCHEMA_DESCRIPTION};
use super::session::{SessionSettings, SessionState};
use crate::timeline::MergedTimeline;
use crate::types::SourceRecord;

/// Upper bound on a single deadline, far beyond any realistic replay
const MAX_DUE: std::time::Duration = std::time::Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The next frame a session will emit, before any waiting happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedFrame {
    /// Index into the merged timeline
    pub index: usize,
    /// Sequence number the frame will carry
    pub sequence: u64,
    /// Loop iteration, starting at 0
    pub loop_index: u64,
    /// Wall-clock delay from session start until the frame is due
    pub due: std::time::Duration,
}

/// Drives the pace and content of one session's output
#[derive(Debug)]
pub struct ReplayScheduler {
    timeline: Arc<MergedTimeline>,
    settings: SessionSettings,
    state: SessionState,
    cursor: usize,
    loop_index: u64,
    sequence_counter: u64,
    filtered_len: usize,
    cycle_span: Duration,
    session_start: Option<Instant>,
}

impl ReplayScheduler {
    /// Create a scheduler over a shared timeline
    pub fn new(timeline: Arc<MergedTimeline>, settings: SessionSettings) -> Self {
        let filter = settings.dataset_filter();
        let filtered_len =
            timeline.records().iter().filter(|record| filter.includes(record.source_name())).count();
        let cycle_span = timeline.cycle_span(settings.pad_cycle());

        Self {
            timeline,
            settings,
            state: SessionState::Starting,
            cursor: 0,
            loop_index: 0,
            sequence_counter: 1,
            filtered_len,
            cycle_span,
            session_start: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Playback settings
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Current loop iteration, starting at 0
    pub fn loop_index(&self) -> u64 {
        self.loop_index
    }

    /// Records per cycle after filtering
    pub fn filtered_len(&self) -> usize {
        self.filtered_len
    }

    /// Shift applied per loop iteration
    pub fn cycle_span(&self) -> Duration {
        self.cycle_span
    }

    /// Banner describing this session
    pub fn banner(&self, service: &str) -> Banner {
        let filter = self.settings.dataset_filter();
        Banner {
            service: service.to_string(),
            datasets: self
                .timeline
                .dataset_names()
                .iter()
                .filter(|name| filter.includes(name))
                .cloned()
                .collect(),
            events: self.filtered_len,
            loop_enabled: self.settings.loop_enabled(),
            speed_factor: self.settings.speed_factor(),
            cycle_seconds: duration_secs(self.cycle_span),
            schema: SCHEMA_DESCRIPTION.to_string(),
        }
    }

    /// Start the session clock now, unless it is already running
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Start the session clock at `at`, unless it is already running
    pub fn start_at(&mut self, at: Instant) {
        self.session_start.get_or_insert(at);
    }

    /// Stop the session; no further frames are produced
    pub fn abort(&mut self) {
        if self.state != SessionState::Ended {
            self.state = SessionState::Aborted;
        }
    }

    /// Advance to the next record without waiting.
    ///
    /// Returns `None` once the session is terminal. Reaching the end of the
    /// filtered timeline either wraps into the next loop or ends the session.
    pub fn plan_next(&mut self) -> Option<PlannedFrame> {
        if self.state.is_terminal() {
            return None;
        }
        if self.filtered_len == 0 {
            debug!("Filtered timeline is empty, ending session");
            self.state = SessionState::Ended;
            return None;
        }

        let index = loop {
            if let Some(index) = self.seek_included() {
                break index;
            }
            if !self.settings.loop_enabled() {
                info!("Loop disabled, ending stream");
                self.state = SessionState::Ended;
                return None;
            }
            self.loop_index += 1;
            self.cursor = 0;
            if !self.settings.continuous_sequence() {
                self.sequence_counter = 1;
            }
            self.state = SessionState::Looping;
            info!("Completed loop cycle {}, starting next cycle", self.loop_index);
        };

        self.cursor = index + 1;
        let sequence = self.sequence_counter;
        self.sequence_counter += 1;
        self.state = SessionState::Streaming;

        let record = &self.timeline.records()[index];
        let due = self.due_for(record);

        Some(PlannedFrame { index, sequence, loop_index: self.loop_index, due })
    }

    /// Build the frame for a planned record
    pub fn frame_for(&self, planned: &PlannedFrame) -> EmittedFrame<'_> {
        let record = &self.timeline.records()[planned.index];
        let original = record.original_timestamp();
        let shift = rebase_shift(self.cycle_span, planned.loop_index);
        let adjusted_timestamp = original.shifted(shift).unwrap_or_else(|| {
            warn!("Adjusted timestamp out of range for {}, sending original", original);
            original.clone()
        });

        EmittedFrame {
            record,
            sequence: planned.sequence,
            loop_index: planned.loop_index,
            adjusted_timestamp,
        }
    }

    /// Produce the next frame, waiting until it is due.
    ///
    /// Returns immediately when the deadline has already passed. Returns
    /// `None` once the session has ended or been aborted.
    pub async fn next_frame(&mut self) -> Option<EmittedFrame<'_>> {
        let planned = self.plan_next()?;
        let start = *self.session_start.get_or_insert_with(Instant::now);
        match start.checked_add(planned.due) {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
        Some(self.frame_for(&planned))
    }

    fn seek_included(&mut self) -> Option<usize> {
        let filter = self.settings.dataset_filter();
        let records = self.timeline.records();
        while self.cursor < records.len() {
            if filter.includes(records[self.cursor].source_name()) {
                return Some(self.cursor);
            }
            self.cursor += 1;
        }
        None
    }

    fn due_for(&self, record: &SourceRecord) -> std::time::Duration {
        let offset = duration_secs(self.timeline.offset_of(record));
        let cycles = self.loop_index as f64 * duration_secs(self.cycle_span);
        let wall_secs = (offset + cycles) / self.settings.speed_factor();
        std::time::Duration::try_from_secs_f64(wall_secs.max(0.0)).unwrap_or(MAX_DUE).min(MAX_DUE)
    }
}

/// Timestamp shift for a given loop iteration
pub fn rebase_shift(cycle_span: Duration, loop_index: u64) -> Duration {
    if loop_index == 0 {
        return Duration::zero();
    }
    let loops = i64::try_from(loop_index).unwrap_or(i64::MAX);
    match cycle_span.num_nanoseconds() {
        Some(nanos) => Duration::nanoseconds(nanos.saturating_mul(loops)),
        None => Duration::milliseconds(cycle_span.num_milliseconds().saturating_mul(loops)),
    }
}

/// Duration in fractional seconds
pub fn duration_secs(duration: Duration) -> f64 {
    match duration.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => duration.num_milliseconds() as f64 / 1e3,
    }
}
