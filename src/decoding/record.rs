//! Parsing of tshark `-T fields` output lines.
//!
//! Each line carries three whitespace-separated fields, in the order requested
//! on the tshark command line: `data.data`, `frame.protocols`, `udp.dstport`.

use crate::error_handling::types::RecordError;

use super::types::{RawRecord, RecordKind};

/// `frame.protocols` when tshark stops at IP: the data is the UDP datagram.
pub const BARE_UDP_PROTOCOLS: &str = "eth:ethertype:ip:data";
/// `frame.protocols` when tshark dissects UDP: the data is the TZSP payload.
pub const FULL_TZSP_PROTOCOLS: &str = "eth:ethertype:ip:udp:data";

/// Normalises the hex field before decoding.
///
/// Some tshark versions print `data.data` as `01:00:00:01`, others as
/// `01000001`. New variants belong here.
pub fn clean_hex_field(field: &str) -> String {
    field.chars().filter(|c| *c != ':').collect()
}

fn record_kind(protocols: &str) -> Option<RecordKind> {
    match protocols {
        BARE_UDP_PROTOCOLS => Some(RecordKind::BareUdp),
        FULL_TZSP_PROTOCOLS => Some(RecordKind::FullTzsp),
        _ => None,
    }
}

/// Parses one output line into a [`RawRecord`].
pub fn parse_record(line: &str) -> Result<RawRecord, RecordError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(RecordError::MalformedRecord(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    }

    let kind = record_kind(fields[1]).ok_or_else(|| {
        RecordError::MalformedRecord(format!("unsupported frame protocols '{}'", fields[1]))
    })?;

    let bytes = hex::decode(clean_hex_field(fields[0]))
        .map_err(|e| RecordError::MalformedRecord(format!("invalid packet bytes: {}", e)))?;

    let port = match kind {
        RecordKind::FullTzsp => Some(fields[2].parse::<u16>().map_err(|e| {
            RecordError::MalformedRecord(format!("invalid port '{}': {}", fields[2], e))
        })?),
        RecordKind::BareUdp => None,
    };

    Ok(RawRecord { bytes, kind, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_tzsp_with_colons() {
        let record = parse_record("01:00:00:01:01 eth:ethertype:ip:udp:data 37008").unwrap();
        assert_eq!(record.bytes, vec![0x01, 0x00, 0x00, 0x01, 0x01]);
        assert_eq!(record.kind, RecordKind::FullTzsp);
        assert_eq!(record.port, Some(37008));
    }

    #[test]
    fn parses_unseparated_hex() {
        let record = parse_record("0100000101\teth:ethertype:ip:udp:data\t37008").unwrap();
        assert_eq!(record.bytes, vec![0x01, 0x00, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn bare_udp_ignores_port_field() {
        let record = parse_record("c3509090 eth:ethertype:ip:data not-a-port").unwrap();
        assert_eq!(record.kind, RecordKind::BareUdp);
        assert_eq!(record.port, None);
    }

    #[test]
    fn two_fields_is_malformed() {
        let err = parse_record("0100 eth:ethertype:ip:udp:data").unwrap_err();
        assert!(matches!(err, RecordError::MalformedRecord(_)));
    }

    #[test]
    fn four_fields_is_malformed() {
        assert!(parse_record("0100 eth:ethertype:ip:udp:data 1 2").is_err());
    }

    #[test]
    fn empty_line_is_malformed() {
        assert!(parse_record("").is_err());
    }

    #[test]
    fn unknown_protocol_chain_is_malformed() {
        assert!(parse_record("0100 eth:ethertype:ipv6:udp:data 37008").is_err());
    }

    #[test]
    fn non_hex_bytes_are_malformed() {
        assert!(parse_record("01zz eth:ethertype:ip:udp:data 37008").is_err());
        assert!(parse_record("010 eth:ethertype:ip:udp:data 37008").is_err());
    }

    #[test]
    fn bad_port_is_malformed_for_full_tzsp() {
        assert!(parse_record("0100 eth:ethertype:ip:udp:data 70000").is_err());
    }

    #[test]
    fn clean_hex_field_strips_separators_only() {
        assert_eq!(clean_hex_field("ab:cd:ef"), "abcdef");
        assert_eq!(clean_hex_field("abcdef"), "abcdef");
    }
}
