//! TCP listener
//!
//! One tokio task per accepted connection. Every task reads the same
//! `Arc<MergedTimeline>`; nothing else is shared between sessions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::{ServiceError, ServiceResult};
use super::session::{run_session, shutdown_signalled, SessionSummary};
use crate::dataset::DatasetLoader;
use crate::replay::{ReplayScheduler, SessionSettings};
use crate::timeline::MergedTimeline;
use crate::types::{ReplayConfig, SessionId};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Load the configured datasets and merge them into one timeline
pub fn prepare_timeline(config: &ReplayConfig) -> ServiceResult<MergedTimeline> {
    let kinds = config.selected_datasets()?;
    let loader = DatasetLoader::new(&config.data_root);
    let sources = loader.select(&kinds)?;
    let datasets = loader.load_all(&sources)?;
    Ok(MergedTimeline::from_datasets(datasets)?)
}

/// Accepts connections and runs one replay session per connection
#[derive(Debug)]
pub struct ReplayServer {
    listener: TcpListener,
    timeline: Arc<MergedTimeline>,
    settings: SessionSettings,
    service_name: Arc<str>,
    shutdown_grace: Duration,
}

impl ReplayServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ReplayConfig, timeline: Arc<MergedTimeline>) -> ServiceResult<Self> {
        let settings = SessionSettings::from_config(config)?;
        let addr = config.bind_address();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServiceError::bind(addr.clone(), source))?;

        info!(
            "Listening on {} ({} events, speed x{}, loop={})",
            listener.local_addr().map(|a| a.to_string()).unwrap_or(addr),
            timeline.len(),
            settings.speed_factor(),
            settings.loop_enabled()
        );

        Ok(Self {
            listener,
            timeline,
            settings,
            service_name: Arc::from(config.service_name.as_str()),
            shutdown_grace: config.shutdown_grace(),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> ServiceResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is raised, then drain sessions.
    ///
    /// Sessions still running after the grace period are aborted.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> ServiceResult<()> {
        let mut sessions: Vec<JoinHandle<SessionSummary>> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_signalled(&mut shutdown) => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        sessions.retain(|handle| !handle.is_finished());
                        sessions.push(self.spawn_session(stream, peer, shutdown.clone()));
                    }
                    Err(error) => {
                        warn!("Failed to accept connection: {}", error);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(self.listener);
        sessions.retain(|handle| !handle.is_finished());
        if !sessions.is_empty() {
            info!("Waiting for {} active session(s) to close", sessions.len());
        }

        let deadline = tokio::time::Instant::now() + self.shutdown_grace;
        for mut handle in sessions {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => warn!("Session task failed: {}", error),
                Err(_) => {
                    warn!("Session did not close within the grace period, aborting");
                    handle.abort();
                }
            }
        }

        info!("Replay server stopped");
        Ok(())
    }

    fn spawn_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<SessionSummary> {
        let session_id = SessionId::new();
        let scheduler = ReplayScheduler::new(Arc::clone(&self.timeline), self.settings.clone());
        let service_name = Arc::clone(&self.service_name);

        info!(session = %session_id, %peer, "Client connected");
        if let Err(error) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", peer, error);
        }

        tokio::spawn(async move {
            run_session(stream, scheduler, session_id, &service_name, shutdown).await
        })
    }
}
