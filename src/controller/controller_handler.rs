use std::net::TcpListener;
use std::sync::Arc;

use log::{error, info, warn};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;

use crate::capture::supervisor::CaptureSupervisor;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::metrics::server::MetricsServer;
use crate::metrics::sink::MetricSink;

/// Owns the process lifetime: metric endpoint, capture supervisor and signal
/// handling all hang off one shutdown token.
pub struct Controller {
    pub config: Config,
    shutdown: CancellationToken,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the controller when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until a shutdown signal arrives or the capture fails.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        info!(
            "Exporting TZSP traffic on {} (ports {:?})",
            self.config.interface, self.config.listen_ports
        );

        let registry = Registry::new();
        let sink = Arc::new(MetricSink::register(&registry)?);
        let mut supervisor = CaptureSupervisor::new(&self.config, Arc::clone(&sink))?;

        ensure_bindable(&self.config)?;
        let server = MetricsServer::new(registry, self.config.metrics_addr);
        let server_handle = tokio::spawn(server.run(self.shutdown.clone()));

        let signals = tokio::spawn(wait_for_signal(self.shutdown.clone()));

        let result = supervisor.run(self.shutdown.clone()).await;
        self.shutdown.cancel();
        signals.abort();

        if let Err(e) = server_handle.await {
            error!("Metrics endpoint task failed: {}", e);
            if result.is_ok() {
                return Err(ControllerError::InitializationFailed(format!(
                    "metrics endpoint on {} failed: {}",
                    self.config.metrics_addr, e
                )));
            }
        }

        match result {
            Ok(()) => {
                info!("Shutdown complete");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Fails early when the metric endpoint address is already taken.
fn ensure_bindable(config: &Config) -> Result<(), ControllerError> {
    TcpListener::bind(config.metrics_addr)
        .map(drop)
        .map_err(|e| {
            error!("Unable to bind metrics endpoint {}: {}", config.metrics_addr, e);
            ControllerError::InitializationFailed(format!(
                "unable to bind {}: {}",
                config.metrics_addr, e
            ))
        })
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                None
            }
        };

        tokio::select! {
            _ = ctrl_c() => info!("Ctrl+C received, shutting down"),
            _ = async {
                match terminate.as_mut() {
                    Some(stream) => { stream.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => info!("SIGTERM received, shutting down"),
            _ = shutdown.cancelled() => return,
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = ctrl_c() => info!("Ctrl+C received, shutting down"),
            _ = shutdown.cancelled() => return,
        }
    }

    shutdown.cancel();
}

/// Resolves on Ctrl+C. Never resolves when the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
