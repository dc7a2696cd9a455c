//! Per-connection session driver
//!
//! Writes the banner, then pulls frames from a [`ReplayScheduler`] and writes
//! each one until the scheduler ends, the peer stops accepting writes, or the
//! service shuts down.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace};

use crate::replay::{ReplayScheduler, SessionError, SessionState};
use crate::types::SessionId;

/// Outcome of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: SessionId,
    /// Frames written, banner excluded
    pub frames_sent: u64,
    /// Full passes over the timeline that were completed
    pub loops_completed: u64,
    /// State the session finished in
    pub final_state: SessionState,
    /// Why the session was aborted, if it was
    pub abort_reason: Option<String>,
}

enum Step {
    Frame(Result<Vec<u8>, serde_json::Error>),
    Finished,
    Shutdown,
}

/// Resolve once the shutdown flag is raised.
///
/// A dropped sender never resolves, so sessions keep running.
pub async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

async fn send_line<W>(writer: &mut W, line: &[u8]) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await?;
    writer.flush().await?;
    Ok(())
}

/// Stream one session to `writer`.
///
/// Never fails: transport and serialization problems abort this session only
/// and are reported in the returned summary.
#[instrument(skip_all, fields(session = %session_id))]
pub async fn run_session<W>(
    mut writer: W,
    mut scheduler: ReplayScheduler,
    session_id: SessionId,
    service_name: &str,
    mut shutdown: watch::Receiver<bool>,
) -> SessionSummary
where
    W: AsyncWrite + Unpin,
{
    let mut frames_sent = 0u64;
    let mut abort_reason = None;

    let banner = scheduler.banner(service_name);
    debug!(events = banner.events, datasets = ?banner.datasets, "Sending banner");

    let sent = match banner.to_line() {
        Ok(line) => send_line(&mut writer, &line).await,
        Err(error) => Err(SessionError::from(error)),
    };

    if let Err(error) = sent {
        scheduler.abort();
        abort_reason = Some(error.to_string());
    } else {
        scheduler.start();
        loop {
            let step = tokio::select! {
                biased;
                _ = shutdown_signalled(&mut shutdown) => Step::Shutdown,
                frame = scheduler.next_frame() => match frame {
                    Some(frame) => {
                        trace!(sequence = frame.sequence, dataset = frame.dataset(), "Frame due");
                        Step::Frame(frame.to_line())
                    }
                    None => Step::Finished,
                },
            };

            match step {
                Step::Frame(line) => {
                    let sent = match line {
                        Ok(line) => send_line(&mut writer, &line).await,
                        Err(error) => Err(SessionError::from(error)),
                    };
                    match sent {
                        Ok(()) => frames_sent += 1,
                        Err(error) => {
                            debug!("Write failed: {}", error);
                            scheduler.abort();
                            abort_reason = Some(error.to_string());
                            break;
                        }
                    }
                }
                Step::Finished => break,
                Step::Shutdown => {
                    scheduler.abort();
                    abort_reason = Some("service shutting down".to_string());
                    break;
                }
            }
        }
    }

    if let Err(error) = writer.shutdown().await {
        debug!("Closing connection failed: {}", error);
    }

    let final_state = scheduler.state();
    // A pass that ran to the end counts as completed
    let loops_completed = if final_state == SessionState::Ended && scheduler.filtered_len() > 0 {
        scheduler.loop_index() + 1
    } else {
        scheduler.loop_index()
    };

    let summary = SessionSummary {
        session_id,
        frames_sent,
        loops_completed,
        final_state,
        abort_reason,
    };

    info!(
        frames = summary.frames_sent,
        loops = summary.loops_completed,
        state = %summary.final_state,
        reason = summary.abort_reason.as_deref().unwrap_or("-"),
        "Session ended"
    );
    summary
}
