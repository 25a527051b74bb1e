//! TZSP header decoding.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Version    |     Type      |     Encapsulated Protocol     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Tag Type    |  Tag Length   |   Tag Data ...  (until END)   /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /              Encapsulated Ethernet frame ...                  /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All multi-byte fields are big-endian. Only version 1, type 0 ("received
//! packet") and encapsulated protocol 1 (Ethernet) are understood. The
//! decoder reads the IPv4 header of the encapsulated frame and, for TCP and
//! UDP, the two port fields that follow it.

use std::net::Ipv4Addr;

use crate::error_handling::types::DecodeError;

use super::locality::classify;
use super::protocols::{protocol_name, TCP, UDP};
use super::types::{DecodeOutcome, DecodedPacket, RecordKind};

pub const UDP_HEADER_LEN: usize = 8;
pub const ETHERNET_HEADER_LEN: usize = 14;

const TZSP_VERSION: u8 = 1;
const TZSP_TYPE_RECEIVED: u8 = 0;
const TZSP_ENCAP_ETHERNET: u16 = 1;
const TZSP_TAG_END: u8 = 1;

/// Bounds-checked forward/backward cursor over a packet buffer.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_ipv4(&mut self) -> Result<Ipv4Addr, DecodeError> {
        let b = self.take(4)?;
        Ok(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
    }

    /// Moves the cursor to an absolute offset. Bounds are enforced by the next read.
    fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn position(&self) -> usize {
        self.pos
    }
}

/// Decodes a record payload according to its kind.
///
/// `port` is the UDP destination port reported alongside a
/// [`RecordKind::FullTzsp`] record; for [`RecordKind::BareUdp`] the port is
/// read from the UDP header inside `bytes` instead.
pub fn decode(bytes: &[u8], kind: RecordKind, port: Option<u16>) -> Result<DecodeOutcome, DecodeError> {
    match kind {
        RecordKind::BareUdp => decode_bare_udp(bytes),
        RecordKind::FullTzsp => decode_tzsp(bytes, port.unwrap_or_default()),
    }
}

/// Decodes a UDP datagram (header included) that carries a TZSP payload.
pub fn decode_bare_udp(bytes: &[u8]) -> Result<DecodeOutcome, DecodeError> {
    let mut reader = ByteReader::new(bytes);
    reader.skip(2)?;
    let listen_port = reader.read_u16()?;
    reader.skip(4)?;

    decode_tzsp(&bytes[UDP_HEADER_LEN..], listen_port)
}

/// Decodes a TZSP datagram that arrived on `listen_port`.
pub fn decode_tzsp(bytes: &[u8], listen_port: u16) -> Result<DecodeOutcome, DecodeError> {
    let mut reader = ByteReader::new(bytes);

    let version = reader.read_u8()?;
    if version != TZSP_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let packet_type = reader.read_u8()?;
    if packet_type != TZSP_TYPE_RECEIVED {
        return Err(DecodeError::UnsupportedType(packet_type));
    }

    let protocol = reader.read_u16()?;
    if protocol != TZSP_ENCAP_ETHERNET {
        return Err(DecodeError::UnsupportedProtocol(protocol));
    }

    loop {
        let tag_type = reader.read_u8()?;
        if tag_type == TZSP_TAG_END {
            break;
        }
        let tag_len = reader.read_u8()?;
        reader.skip(usize::from(tag_len))?;
    }

    reader.skip(ETHERNET_HEADER_LEN)?;

    let version_ihl = reader.read_u8()?;
    if version_ihl >> 4 != 4 {
        return Ok(DecodeOutcome::NotIpv4);
    }
    let header_len = usize::from(version_ihl & 0x0f) * 4;
    let header_start = reader.position();
    let after_header = header_start - 1 + header_len;

    reader.skip(1)?;
    let total_length = reader.read_u16()?;
    reader.skip(5)?;
    let protocol_number = reader.read_u8()?;
    reader.skip(2)?;
    let source = reader.read_ipv4()?;
    let destination = reader.read_ipv4()?;

    reader.seek(after_header);

    let (source_port, destination_port) = match protocol_number {
        TCP | UDP => (Some(reader.read_u16()?), Some(reader.read_u16()?)),
        _ => (None, None),
    };

    Ok(DecodeOutcome::Packet(DecodedPacket {
        source,
        destination,
        source_class: classify(source),
        destination_class: classify(destination),
        protocol: protocol_name(protocol_number),
        total_length,
        listen_port,
        source_port,
        destination_port,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::decoding::types::Locality;

    /// Builds a TZSP datagram around an IPv4 header with the given fields.
    ///
    /// `tags` are (type, data) pairs emitted before the END tag. `options`
    /// are appended to the 20-byte IPv4 header and reflected in the IHL.
    pub(crate) fn build_tzsp(
        tags: &[(u8, &[u8])],
        protocol: u8,
        source: Ipv4Addr,
        destination: Ipv4Addr,
        total_length: u16,
        ports: Option<(u16, u16)>,
        options: &[u8],
    ) -> Vec<u8> {
        let mut buf = vec![TZSP_VERSION, TZSP_TYPE_RECEIVED, 0x00, 0x01];
        for (tag_type, data) in tags {
            buf.push(*tag_type);
            buf.push(data.len() as u8);
            buf.extend_from_slice(data);
        }
        buf.push(TZSP_TAG_END);

        // Ethernet: dst mac, src mac, ethertype IPv4
        buf.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        buf.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]);
        buf.extend_from_slice(&[0x08, 0x00]);

        let ihl = (20 + options.len()) / 4;
        buf.push(0x40 | ihl as u8);
        buf.push(0x00);
        buf.extend_from_slice(&total_length.to_be_bytes());
        buf.extend_from_slice(&[0x12, 0x34, 0x40, 0x00, 0x40]);
        buf.push(protocol);
        buf.extend_from_slice(&[0x00, 0x00]);
        buf.extend_from_slice(&source.octets());
        buf.extend_from_slice(&destination.octets());
        buf.extend_from_slice(options);

        if let Some((src, dst)) = ports {
            buf.extend_from_slice(&src.to_be_bytes());
            buf.extend_from_slice(&dst.to_be_bytes());
        }
        buf
    }

    pub(crate) fn tcp_sample() -> Vec<u8> {
        build_tzsp(
            &[],
            TCP,
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(203, 0, 113, 5),
            60,
            Some((443, 51000)),
            &[],
        )
    }

    fn expect_packet(outcome: Result<DecodeOutcome, DecodeError>) -> DecodedPacket {
        match outcome {
            Ok(DecodeOutcome::Packet(p)) => p,
            other => panic!("expected decoded packet, got {:?}", other),
        }
    }

    #[test]
    fn decodes_tcp_packet() {
        let packet = expect_packet(decode_tzsp(&tcp_sample(), 37008));

        assert_eq!(packet.source, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(packet.destination, Ipv4Addr::new(203, 0, 113, 5));
        assert_eq!(packet.source_class, Locality::Private);
        assert_eq!(packet.destination_class, Locality::Public);
        assert_eq!(packet.protocol, "tcp");
        assert_eq!(packet.total_length, 60);
        assert_eq!(packet.listen_port, 37008);
        assert_eq!(packet.source_port, Some(443));
        assert_eq!(packet.destination_port, Some(51000));
    }

    #[test]
    fn bare_udp_takes_listen_port_from_udp_header() {
        let mut buf = vec![0xc3, 0x50, 0x90, 0x90, 0x00, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&tcp_sample());

        let packet = expect_packet(decode(&buf, RecordKind::BareUdp, Some(1)));
        assert_eq!(packet.listen_port, 0x9090);
        assert_eq!(packet.source_port, Some(443));
    }

    #[test]
    fn full_tzsp_uses_reported_port() {
        let packet = expect_packet(decode(&tcp_sample(), RecordKind::FullTzsp, Some(37008)));
        assert_eq!(packet.listen_port, 37008);
    }

    #[test]
    fn bare_udp_shorter_than_header_is_truncated() {
        let err = decode_bare_udp(&[0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut buf = tcp_sample();
        buf[0] = 2;
        assert_eq!(decode_tzsp(&buf, 1).unwrap_err(), DecodeError::UnsupportedVersion(2));
    }

    #[test]
    fn rejects_unsupported_type() {
        let mut buf = tcp_sample();
        buf[1] = 4;
        assert_eq!(decode_tzsp(&buf, 1).unwrap_err(), DecodeError::UnsupportedType(4));
    }

    #[test]
    fn rejects_unsupported_protocol() {
        let mut buf = tcp_sample();
        buf[3] = 18;
        assert_eq!(decode_tzsp(&buf, 1).unwrap_err(), DecodeError::UnsupportedProtocol(18));
    }

    #[test]
    fn skips_tags_before_end() {
        let buf = build_tzsp(
            &[(10, &[0xaa, 0xbb, 0xcc]), (40, &[]), (12, &[0x01])],
            UDP,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(224, 0, 0, 251),
            84,
            Some((5353, 5353)),
            &[],
        );
        let packet = expect_packet(decode_tzsp(&buf, 1));
        assert_eq!(packet.protocol, "udp");
        assert_eq!(packet.destination_class, Locality::Multicast);
        assert_eq!(packet.source_port, Some(5353));
        assert_eq!(packet.destination_port, Some(5353));
    }

    #[test]
    fn tag_running_past_buffer_is_truncated() {
        let buf = [TZSP_VERSION, TZSP_TYPE_RECEIVED, 0x00, 0x01, 0x0a, 0x20, 0x00];
        assert!(matches!(
            decode_tzsp(&buf, 1).unwrap_err(),
            DecodeError::Truncated { .. }
        ));
    }

    #[test]
    fn missing_end_tag_is_truncated() {
        let buf = [TZSP_VERSION, TZSP_TYPE_RECEIVED, 0x00, 0x01, 0x0a, 0x00];
        assert!(matches!(
            decode_tzsp(&buf, 1).unwrap_err(),
            DecodeError::Truncated { .. }
        ));
    }

    #[test]
    fn non_ipv4_frame_is_benign() {
        let mut buf = tcp_sample();
        // version/IHL byte follows the 4-byte header, END tag and Ethernet header
        let ip_offset = 4 + 1 + ETHERNET_HEADER_LEN;
        buf[ip_offset] = 0x60;
        assert_eq!(decode_tzsp(&buf, 1), Ok(DecodeOutcome::NotIpv4));
    }

    #[test]
    fn ip_options_are_skipped() {
        let buf = build_tzsp(
            &[],
            TCP,
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(10, 9, 8, 7),
            64,
            Some((53, 40000)),
            &[0x01, 0x01, 0x01, 0x00],
        );
        let packet = expect_packet(decode_tzsp(&buf, 1));
        assert_eq!(packet.source_port, Some(53));
        assert_eq!(packet.destination_port, Some(40000));
    }

    #[test]
    fn non_port_protocols_have_no_ports() {
        let buf = build_tzsp(
            &[],
            1,
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(192, 168, 0, 10),
            84,
            None,
            &[],
        );
        let packet = expect_packet(decode_tzsp(&buf, 1));
        assert_eq!(packet.protocol, "icmp");
        assert_eq!(packet.source_port, None);
        assert_eq!(packet.destination_port, None);

        let buf = build_tzsp(
            &[],
            254,
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(192, 168, 0, 10),
            84,
            None,
            &[],
        );
        let packet = expect_packet(decode_tzsp(&buf, 1));
        assert_eq!(packet.protocol, "unknown");
        assert_eq!(packet.source_port, None);
    }

    #[test]
    fn tcp_without_ports_is_truncated() {
        let buf = build_tzsp(
            &[],
            TCP,
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(192, 168, 0, 10),
            40,
            None,
            &[],
        );
        assert!(matches!(
            decode_tzsp(&buf, 1).unwrap_err(),
            DecodeError::Truncated { .. }
        ));
    }

    #[test]
    fn every_truncation_of_a_valid_packet_fails_cleanly() {
        let buf = tcp_sample();
        for len in 0..buf.len() {
            assert!(decode_tzsp(&buf[..len], 1).is_err(), "length {}", len);
        }
    }
}
