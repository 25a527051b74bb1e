//! Lifecycle of the capture subprocess.
//!
//! ```text
//! Idle ─▶ Verifying ─▶ Starting ─▶ Running ─▶ Draining ─┐
//!  ▲                      ▲                              │ exit 0
//!  │                      └──────────────────────────────┘
//!  └─ (once)                   cancellation / failure ─▶ Stopped
//! ```
//!
//! Every iteration runs tshark with a packet-count ceiling. When it exits on
//! its own the supervisor cleans the temp directory and starts the next run.
//! Counters live in the shared [`MetricSink`] and survive restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::configuration::config::Config;
use crate::error_handling::types::CaptureError;
use crate::metrics::sink::MetricSink;

use super::session::CaptureSession;
use super::stream_reader::{read_data_stream, read_diagnostic_stream, StreamStats};
use super::temp_files::TempArtifactCleaner;
use super::tool::CaptureTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Verifying,
    Starting,
    Running,
    Draining,
    Stopped,
}

/// How one capture iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterationEnd {
    /// tshark reached its packet ceiling and exited cleanly.
    Completed,
    /// Shutdown was requested.
    Cancelled,
}

pub struct CaptureSupervisor {
    tool: CaptureTool,
    cleaner: TempArtifactCleaner,
    sink: Arc<MetricSink>,
    interface: String,
    listen_ports: Vec<u16>,
    packets_per_capture: u64,
    drain_timeout: Duration,
    state: SupervisorState,
    iterations: u64,
}

impl CaptureSupervisor {
    pub fn new(config: &Config, sink: Arc<MetricSink>) -> Result<Self, CaptureError> {
        Ok(Self {
            tool: CaptureTool::new(&config.tshark_path),
            cleaner: TempArtifactCleaner::new(&config.temp_dir)?,
            sink,
            interface: config.interface.clone(),
            listen_ports: config.listen_ports.clone(),
            packets_per_capture: config.packets_per_capture,
            drain_timeout: config.drain_timeout,
            state: SupervisorState::Idle,
            iterations: 0,
        })
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of capture runs started so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    fn transition(&mut self, next: SupervisorState) {
        debug!("Supervisor state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Verifies the capture tool, then captures until `shutdown` fires or the
    /// tool fails.
    ///
    /// Returns `Ok(())` on requested shutdown. Any error cancels `shutdown` so
    /// that the rest of the process winds down too.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), CaptureError> {
        self.transition(SupervisorState::Verifying);
        let banner = match self.tool.verify_version().await {
            Ok(banner) => banner,
            Err(e) => {
                self.transition(SupervisorState::Stopped);
                shutdown.cancel();
                return Err(e);
            }
        };
        info!("Using {}", banner);
        self.transition(SupervisorState::Idle);

        let result = loop {
            if shutdown.is_cancelled() {
                break Ok(());
            }
            match self.run_once(&shutdown).await {
                Ok(IterationEnd::Completed) => self.transition(SupervisorState::Idle),
                Ok(IterationEnd::Cancelled) => break Ok(()),
                Err(e) => {
                    error!("Capture stopped: {}", e);
                    shutdown.cancel();
                    break Err(e);
                }
            }
        };

        self.transition(SupervisorState::Stopped);
        info!("Capture supervisor stopped after {} run(s)", self.iterations);
        result
    }

    async fn run_once(&mut self, shutdown: &CancellationToken) -> Result<IterationEnd, CaptureError> {
        self.transition(SupervisorState::Starting);
        let removed = self.cleaner.remove_stale();
        if removed > 0 {
            debug!(
                "Removed {} stale capture file(s) from {}",
                removed,
                self.cleaner.dir().display()
            );
        }

        let session = CaptureSession::new(&self.interface, &self.listen_ports, self.packets_per_capture);
        let mut child = self.tool.spawn(&session)?;
        self.iterations += 1;
        info!(
            "[{}] Capture started on {} ({}), limit {} packets",
            session.id,
            session.interface,
            session.capture_filter(),
            session.packet_limit
        );

        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::ReaderFailed("capture tool stdout was not piped".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            CaptureError::ReaderFailed("capture tool stderr was not piped".to_string())
        })?;

        // Readers stop on shutdown, or when the drain timeout expires.
        let iteration = shutdown.child_token();

        let data_reader: JoinHandle<Result<StreamStats, CaptureError>> = {
            let sink = Arc::clone(&self.sink);
            let cancel = iteration.clone();
            let fault = shutdown.clone();
            let id = session.id;
            tokio::spawn(async move {
                let result = read_data_stream(stdout, &sink, cancel, id).await;
                if result.is_err() {
                    fault.cancel();
                }
                result
            })
        };
        let diagnostic_reader: JoinHandle<Result<u64, CaptureError>> = {
            let cancel = iteration.clone();
            let fault = shutdown.clone();
            let id = session.id;
            tokio::spawn(async move {
                let result = read_diagnostic_stream(stderr, cancel, id).await;
                if result.is_err() {
                    fault.cancel();
                }
                result
            })
        };
        self.transition(SupervisorState::Running);

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = shutdown.cancelled() => None,
        };

        // Readers are joined on every path, including a failed wait.
        self.transition(SupervisorState::Draining);
        let (data_result, diagnostic_result) = drain_readers(
            data_reader,
            diagnostic_reader,
            self.drain_timeout,
            &iteration,
        )
        .await;
        drop(child);

        let status = status.transpose().map_err(|e| {
            error!("[{}] Lost track of the capture tool: {}", session.id, e);
            CaptureError::StreamError(e)
        })?;
        let stats = flatten(data_result)?;
        flatten(diagnostic_result)?;

        let duration = Utc::now() - session.started_at;
        info!(
            "[{}] Capture finished: lines={}, recorded={}, not_ipv4={}, malformed={}, undecodable={}, duration={}s",
            session.id,
            stats.lines,
            stats.recorded,
            stats.not_ipv4,
            stats.malformed,
            stats.undecodable,
            duration.num_seconds()
        );

        match status {
            None => {
                info!("[{}] Capture cancelled", session.id);
                Ok(IterationEnd::Cancelled)
            }
            Some(status) if status.success() => Ok(IterationEnd::Completed),
            Some(status) if shutdown.is_cancelled() => {
                debug!("[{}] Capture tool exited with {} during shutdown", session.id, status);
                Ok(IterationEnd::Cancelled)
            }
            Some(status) => {
                error!("[{}] Capture tool exited with {}", session.id, status);
                Err(CaptureError::ToolFailed(status.code()))
            }
        }
    }
}

/// Waits up to `timeout` for both readers to reach end-of-stream, then
/// cancels `iteration` and collects whatever they managed to read.
async fn drain_readers<A, B>(
    mut data: JoinHandle<A>,
    mut diagnostic: JoinHandle<B>,
    timeout: Duration,
    iteration: &CancellationToken,
) -> (Result<A, JoinError>, Result<B, JoinError>) {
    let joined = tokio::time::timeout(timeout, async {
        tokio::join!(&mut data, &mut diagnostic)
    })
    .await;
    match joined {
        Ok(results) => results,
        Err(_) => {
            warn!("Output not drained within {:?}, abandoning remaining lines", timeout);
            iteration.cancel();
            tokio::join!(data, diagnostic)
        }
    }
}

fn flatten<T>(joined: Result<Result<T, CaptureError>, JoinError>) -> Result<T, CaptureError> {
    joined.map_err(|e| CaptureError::ReaderFailed(e.to_string()))?
}
