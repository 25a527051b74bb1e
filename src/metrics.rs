pub mod server;
pub mod sink;

pub use server::MetricsServer;
pub use sink::{MetricKey, MetricSink};
