use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments.
///
/// Every flag is optional here; values missing from the command line are
/// taken from the `--config` file, then from built-in defaults. The interface
/// and the listen ports have no default and must come from one of the two.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tzsp-exporter")]
#[command(version)]
#[command(about = "Exports traffic statistics decoded from TZSP streams as Prometheus counters")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Network interface tshark listens on
    #[arg(long, short = 'i', env = "TZSP_INTERFACE")]
    pub interface: Option<String>,

    /// UDP port(s) receiving TZSP streams. Repeat the flag or separate with commas
    #[arg(long = "listen-port", short = 'p', env = "TZSP_LISTEN_PORTS", value_delimiter = ',')]
    pub listen_ports: Vec<u16>,

    /// Address the metrics endpoint binds to
    #[arg(long)]
    pub metrics_bind_address: Option<String>,

    /// Port of the metrics endpoint
    #[arg(long, env = "TZSP_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Number of packets after which tshark is restarted
    #[arg(long)]
    pub packets_per_capture: Option<u64>,

    /// tshark executable
    #[arg(long)]
    pub tshark_path: Option<PathBuf>,

    /// Directory where tshark leaves its temporary capture files
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Seconds to wait for buffered output after tshark exits
    #[arg(long)]
    pub drain_timeout_secs: Option<u64>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Capture interface name. Never contains a double quote.
    pub interface: String,
    /// Non-empty, de-duplicated, first occurrence order.
    pub listen_ports: Vec<u16>,
    pub metrics_addr: SocketAddr,
    /// Packet-count ceiling handed to tshark with `-c`. Bounded captures let
    /// the temp files tshark leaves behind be reclaimed between runs.
    pub packets_per_capture: u64,
    pub tshark_path: PathBuf,
    pub temp_dir: PathBuf,
    pub drain_timeout: Duration,
}

impl Config {
    /// Parses the process arguments and builds the configuration from them.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::load(CliArgs::parse())
    }

    /// Builds the configuration from parsed arguments, reading the file they
    /// point to if any.
    pub fn load(args: CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<FileConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// Merges both sources, command line first, and validates the result.
    pub fn merge(args: CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let interface = args
            .interface
            .or(file.interface)
            .ok_or(ConfigError::MissingInterface)?;
        if interface.trim().is_empty() {
            return Err(ConfigError::MissingInterface);
        }
        if interface.contains('"') {
            return Err(ConfigError::BadInterfaceName(format!(
                "'{}' contains a double quote",
                interface
            )));
        }

        let listen_ports = if args.listen_ports.is_empty() {
            file.listen_ports.unwrap_or_default()
        } else {
            args.listen_ports
        };
        let listen_ports = dedup_ports(listen_ports)?;

        let bind_address = args
            .metrics_bind_address
            .or(file.metrics_bind_address)
            .unwrap_or_else(|| DEFAULT_METRICS_BIND_ADDRESS.to_string());
        let bind_ip: IpAddr = bind_address
            .parse()
            .map_err(|_| ConfigError::BadIPFormatting(bind_address.clone()))?;
        let metrics_port = args
            .metrics_port
            .or(file.metrics_port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        let packets_per_capture = args
            .packets_per_capture
            .or(file.packets_per_capture)
            .unwrap_or(DEFAULT_PACKETS_PER_CAPTURE);
        if packets_per_capture == 0 {
            return Err(ConfigError::NotInRange(
                "packets_per_capture must be at least 1".to_string(),
            ));
        }

        let tshark_path = args
            .tshark_path
            .or(file.tshark_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TSHARK_PATH));

        let temp_dir = args
            .temp_dir
            .or(file.temp_dir)
            .unwrap_or_else(std::env::temp_dir);
        if !temp_dir.is_dir() {
            return Err(ConfigError::DirectoryDoesNotExist(
                temp_dir.display().to_string(),
            ));
        }

        let drain_timeout_secs = args
            .drain_timeout_secs
            .or(file.drain_timeout_secs)
            .unwrap_or(DEFAULT_DRAIN_TIMEOUT_SECS);
        if drain_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "drain_timeout_secs must be at least 1".to_string(),
            ));
        }
        let drain_timeout = Duration::from_secs(drain_timeout_secs);

        Ok(Config {
            interface,
            listen_ports,
            metrics_addr: SocketAddr::new(bind_ip, metrics_port),
            packets_per_capture,
            tshark_path,
            temp_dir,
            drain_timeout,
        })
    }
}

fn dedup_ports(ports: Vec<u16>) -> Result<Vec<u16>, ConfigError> {
    if ports.is_empty() {
        return Err(ConfigError::ListenPortsEmpty);
    }
    let mut unique = Vec::with_capacity(ports.len());
    for port in ports {
        if port == 0 {
            return Err(ConfigError::BadPort("listen port 0 is not valid".to_string()));
        }
        if !unique.contains(&port) {
            unique.push(port);
        }
    }
    Ok(unique)
}
