use std::net::Ipv4Addr;

use super::types::Locality;

/// 224.0.0.0/4
const MULTICAST: (Ipv4Addr, u8) = (Ipv4Addr::new(224, 0, 0, 0), 4);

/// RFC 1918 ranges, checked in this order.
const PRIVATE_RANGES: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

fn in_network(addr: Ipv4Addr, (network, prefix_len): (Ipv4Addr, u8)) -> bool {
    let mask = u32::MAX << (32 - u32::from(prefix_len));
    u32::from(addr) & mask == u32::from(network) & mask
}

/// Classifies an address as multicast, private or public.
pub fn classify(addr: Ipv4Addr) -> Locality {
    if in_network(addr, MULTICAST) {
        return Locality::Multicast;
    }

    if PRIVATE_RANGES.iter().any(|range| in_network(addr, *range)) {
        return Locality::Private;
    }

    Locality::Public
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_addresses() {
        assert_eq!(classify(Ipv4Addr::new(224, 0, 0, 5)), Locality::Multicast);
        assert_eq!(classify(Ipv4Addr::new(10, 1, 2, 3)), Locality::Private);
        assert_eq!(classify(Ipv4Addr::new(172, 16, 0, 1)), Locality::Private);
        assert_eq!(classify(Ipv4Addr::new(172, 32, 0, 1)), Locality::Public);
        assert_eq!(classify(Ipv4Addr::new(8, 8, 8, 8)), Locality::Public);
    }

    #[test]
    fn range_boundaries() {
        assert_eq!(classify(Ipv4Addr::new(223, 255, 255, 255)), Locality::Public);
        assert_eq!(classify(Ipv4Addr::new(239, 255, 255, 255)), Locality::Multicast);
        assert_eq!(classify(Ipv4Addr::new(240, 0, 0, 0)), Locality::Public);
        assert_eq!(classify(Ipv4Addr::new(172, 31, 255, 255)), Locality::Private);
        assert_eq!(classify(Ipv4Addr::new(172, 15, 255, 255)), Locality::Public);
        assert_eq!(classify(Ipv4Addr::new(192, 168, 255, 255)), Locality::Private);
        assert_eq!(classify(Ipv4Addr::new(192, 169, 0, 0)), Locality::Public);
        assert_eq!(classify(Ipv4Addr::new(11, 0, 0, 0)), Locality::Public);
    }

    #[test]
    fn every_first_octet_maps_to_one_class() {
        for octet in 0..=255u8 {
            let class = classify(Ipv4Addr::new(octet, 16, 0, 1));
            let expected = match octet {
                224..=239 => Locality::Multicast,
                10 | 172 => Locality::Private,
                _ => Locality::Public,
            };
            assert_eq!(class, expected, "first octet {}", octet);
        }
    }
}
