use log::trace;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::decoding::types::DecodedPacket;
use crate::error_handling::types::MetricsError;

pub const LABEL_NAMES: [&str; 6] = [
    "from_ip",
    "from_ip_type",
    "to_ip",
    "to_ip_type",
    "protocol",
    "listen_port",
];

/// Label tuple identifying one counter series.
///
/// One series exists per distinct combination ever observed; series are never
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub source: String,
    pub source_class: String,
    pub destination: String,
    pub destination_class: String,
    pub protocol: String,
    pub listen_port: String,
}

impl MetricKey {
    fn label_values(&self) -> [&str; 6] {
        [
            &self.source,
            &self.source_class,
            &self.destination,
            &self.destination_class,
            &self.protocol,
            &self.listen_port,
        ]
    }
}

impl From<&DecodedPacket> for MetricKey {
    fn from(packet: &DecodedPacket) -> Self {
        Self {
            source: packet.source.to_string(),
            source_class: packet.source_class.as_str().to_string(),
            destination: packet.destination.to_string(),
            destination_class: packet.destination_class.as_str().to_string(),
            protocol: packet.protocol.to_string(),
            listen_port: packet.listen_port.to_string(),
        }
    }
}

/// Byte and packet counters for decoded traffic.
///
/// Both families are prometheus `IntCounterVec`s, so increments are atomic per
/// series and the sink can be shared across reader tasks without locking.
#[derive(Clone)]
pub struct MetricSink {
    bytes: IntCounterVec,
    packets: IntCounterVec,
}

impl MetricSink {
    /// Creates both counter families and registers them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, MetricsError> {
        let bytes = IntCounterVec::new(
            Opts::new("tzsp_bytes_total", "Total bytes observed in TZSP-encapsulated IPv4 packets"),
            &LABEL_NAMES,
        )
        .map_err(MetricsError::RegistrationFailed)?;
        let packets = IntCounterVec::new(
            Opts::new("tzsp_packets_total", "Total TZSP-encapsulated IPv4 packets observed"),
            &LABEL_NAMES,
        )
        .map_err(MetricsError::RegistrationFailed)?;

        registry
            .register(Box::new(bytes.clone()))
            .map_err(MetricsError::RegistrationFailed)?;
        registry
            .register(Box::new(packets.clone()))
            .map_err(MetricsError::RegistrationFailed)?;

        Ok(Self { bytes, packets })
    }

    /// Adds one packet of `bytes` to the series identified by `key`.
    pub fn increment(&self, key: &MetricKey, bytes: u64) {
        let labels = key.label_values();
        self.bytes.with_label_values(&labels).inc_by(bytes);
        self.packets.with_label_values(&labels).inc();
    }

    pub fn record(&self, packet: &DecodedPacket) {
        let key = MetricKey::from(packet);
        trace!(
            "{}:{:?} -> {}:{:?} {} {} bytes on port {}",
            packet.source,
            packet.source_port,
            packet.destination,
            packet.destination_port,
            packet.protocol,
            packet.total_length,
            packet.listen_port
        );
        self.increment(&key, u64::from(packet.total_length));
    }

    pub fn bytes_total(&self, key: &MetricKey) -> u64 {
        self.bytes.with_label_values(&key.label_values()).get()
    }

    pub fn packets_total(&self, key: &MetricKey) -> u64 {
        self.packets.with_label_values(&key.label_values()).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(port: &str) -> MetricKey {
        MetricKey {
            source: "192.168.1.1".to_string(),
            source_class: "private".to_string(),
            destination: "203.0.113.5".to_string(),
            destination_class: "public".to_string(),
            protocol: "tcp".to_string(),
            listen_port: port.to_string(),
        }
    }

    #[test]
    fn increments_accumulate_per_series() {
        let registry = Registry::new();
        let sink = MetricSink::register(&registry).unwrap();

        sink.increment(&key("37008"), 60);
        sink.increment(&key("37008"), 40);
        sink.increment(&key("37009"), 1500);

        assert_eq!(sink.bytes_total(&key("37008")), 100);
        assert_eq!(sink.packets_total(&key("37008")), 2);
        assert_eq!(sink.bytes_total(&key("37009")), 1500);
        assert_eq!(sink.packets_total(&key("37009")), 1);
    }

    #[test]
    fn registers_two_families_once() {
        let registry = Registry::new();
        let sink = MetricSink::register(&registry).unwrap();
        sink.increment(&key("1"), 1);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"tzsp_bytes_total".to_string()));
        assert!(names.contains(&"tzsp_packets_total".to_string()));

        assert!(matches!(
            MetricSink::register(&registry),
            Err(MetricsError::RegistrationFailed(_))
        ));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let registry = Registry::new();
        let sink = Arc::new(MetricSink::register(&registry).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        sink.increment(&key("1"), 2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.packets_total(&key("1")), 8000);
        assert_eq!(sink.bytes_total(&key("1")), 16000);
    }
}
