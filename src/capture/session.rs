use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fields tshark prints for every packet, in this order.
pub const OUTPUT_FIELDS: [&str; 3] = ["data.data", "frame.protocols", "udp.dstport"];

/// One bounded run of the capture tool.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Correlates log lines of one run.
    pub id: Uuid,
    pub interface: String,
    pub listen_ports: Vec<u16>,
    /// tshark exits on its own after this many packets.
    pub packet_limit: u64,
    pub started_at: DateTime<Utc>,
}

impl CaptureSession {
    pub fn new(interface: &str, listen_ports: &[u16], packet_limit: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            interface: interface.to_string(),
            listen_ports: listen_ports.to_vec(),
            packet_limit,
            started_at: Utc::now(),
        }
    }

    /// Capture filter accepting UDP traffic to any of the listen ports.
    pub fn capture_filter(&self) -> String {
        let ports = self
            .listen_ports
            .iter()
            .map(|port| format!("dst port {}", port))
            .collect::<Vec<_>>()
            .join(" or ");
        format!("({}) and udp", ports)
    }

    /// Arguments for a tshark run bounded to `packet_limit` packets.
    pub fn tool_arguments(&self) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.interface.clone(),
            "-f".to_string(),
            self.capture_filter(),
            "-p".to_string(),
            "-T".to_string(),
            "fields".to_string(),
        ];
        for field in OUTPUT_FIELDS {
            args.push("-e".to_string());
            args.push(field.to_string());
        }
        args.extend([
            "-E".to_string(),
            "separator=/s".to_string(),
            "-Q".to_string(),
            "-c".to_string(),
            self.packet_limit.to_string(),
        ]);
        args
    }
}
