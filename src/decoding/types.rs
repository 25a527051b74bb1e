//! Common data types shared by the record parser and the header decoder.

use std::fmt;
use std::net::Ipv4Addr;

/// Shape of the hex payload carried by one tshark record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// tshark stopped dissecting at IP: the payload starts with the UDP header.
    BareUdp,
    /// tshark dissected UDP: the payload is the TZSP datagram itself.
    FullTzsp,
}

/// One parsed line of tshark output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub bytes: Vec<u8>,
    pub kind: RecordKind,
    /// UDP destination port reported by tshark, only present for [`RecordKind::FullTzsp`].
    pub port: Option<u16>,
}

/// Locality class of an IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    Multicast,
    Private,
    Public,
}

impl Locality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locality::Multicast => "multicast",
            Locality::Private => "private",
            Locality::Public => "public",
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields extracted from one encapsulated IPv4 packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub source_class: Locality,
    pub destination_class: Locality,
    pub protocol: &'static str,
    /// IP total length, header included.
    pub total_length: u16,
    /// UDP port the TZSP stream arrived on.
    pub listen_port: u16,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
}

/// Successful result of decoding a TZSP buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Packet(DecodedPacket),
    /// The encapsulated frame does not carry IPv4. Dropped without logging.
    NotIpv4,
}
