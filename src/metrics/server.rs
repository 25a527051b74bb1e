use std::net::SocketAddr;

use log::{error, info};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio_util::sync::CancellationToken;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::error_handling::types::MetricsError;

/// Renders every family gathered from `registry` in the Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(MetricsError::EncodeFailed)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// GET /metrics
pub fn metrics_route(
    registry: Registry,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let registry = registry.clone();
            async move {
                match encode_metrics(&registry) {
                    Ok(body) => Ok::<_, Rejection>(
                        reply::with_status(
                            reply::with_header(body, "Content-Type", TextEncoder::new().format_type()),
                            StatusCode::OK,
                        )
                        .into_response(),
                    ),
                    Err(e) => {
                        error!("Failed to encode metrics: {}", e);
                        Ok::<_, Rejection>(
                            reply::with_status(
                                "Failed to encode metrics".to_string(),
                                StatusCode::INTERNAL_SERVER_ERROR,
                            )
                            .into_response(),
                        )
                    }
                }
            }
        })
}

/// Scrape endpoint for the counters registered in a [`Registry`].
pub struct MetricsServer {
    registry: Registry,
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(registry: Registry, addr: SocketAddr) -> Self {
        Self { registry, addr }
    }

    /// Serves `/metrics` until `shutdown` is cancelled, after which no new
    /// scrapes are accepted.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Serving metrics on http://{}/metrics", self.addr);
        let routes = metrics_route(self.registry);

        tokio::select! {
            _ = warp::serve(routes).run(self.addr) => {}
            _ = shutdown.cancelled() => {
                info!("Metrics endpoint stopped");
            }
        }
    }
}
