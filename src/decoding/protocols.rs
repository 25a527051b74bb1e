//! IANA assigned internet protocol numbers.

pub const ICMP: u8 = 1;
pub const TCP: u8 = 6;
pub const UDP: u8 = 17;

/// Returns the lowercase protocol keyword for `number`, or `"unknown"`.
pub fn protocol_name(number: u8) -> &'static str {
    match number {
        0 => "hopopt",
        ICMP => "icmp",
        2 => "igmp",
        3 => "ggp",
        4 => "ipv4",
        5 => "st",
        TCP => "tcp",
        8 => "egp",
        9 => "igp",
        UDP => "udp",
        27 => "rdp",
        33 => "dccp",
        41 => "ipv6",
        43 => "ipv6-route",
        44 => "ipv6-frag",
        46 => "rsvp",
        47 => "gre",
        50 => "esp",
        51 => "ah",
        58 => "ipv6-icmp",
        59 => "ipv6-nonxt",
        60 => "ipv6-opts",
        88 => "eigrp",
        89 => "ospf",
        94 => "ipip",
        97 => "etherip",
        98 => "encap",
        103 => "pim",
        108 => "ipcomp",
        112 => "vrrp",
        115 => "l2tp",
        132 => "sctp",
        136 => "udplite",
        137 => "mpls-in-ip",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_protocols() {
        assert_eq!(protocol_name(TCP), "tcp");
        assert_eq!(protocol_name(UDP), "udp");
        assert_eq!(protocol_name(ICMP), "icmp");
        assert_eq!(protocol_name(47), "gre");
    }

    #[test]
    fn unassigned_numbers_are_unknown() {
        assert_eq!(protocol_name(253), "unknown");
        assert_eq!(protocol_name(255), "unknown");
    }
}
