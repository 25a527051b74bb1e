use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_METRICS_PORT: u16 = 9184;
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PACKETS_PER_CAPTURE: u64 = 100_000;
pub const DEFAULT_TSHARK_PATH: &str = "tshark";
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

/// On-disk TOML layout. Every key is optional so that command-line flags can
/// fill the gaps.
///
/// ```toml
/// interface = "eth0"
/// listen_ports = [37008]
/// metrics_port = 9184
/// packets_per_capture = 100000
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub interface: Option<String>,
    pub listen_ports: Option<Vec<u16>>,
    pub metrics_bind_address: Option<String>,
    pub metrics_port: Option<u16>,
    pub packets_per_capture: Option<u64>,
    pub tshark_path: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub drain_timeout_secs: Option<u64>,
}
