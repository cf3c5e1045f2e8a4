/// A local socket address as printed by `ss` or `lsof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SocketAddress {
    /// Normalized address: brackets and zone suffix stripped, `*` mapped to
    /// `0.0.0.0`.
    pub address: String,
    pub port: u16,
    /// The address was printed in bracketed IPv6 form.
    pub ipv6: bool,
}

/// Parse an address:port string.
///
/// Handles multiple address formats:
/// - IPv4: "127.0.0.1:3000" or "*:8080"
/// - IPv6: "\[::1]:3000" or "\[fe80::1%eth0]:8080"
/// - Zone-scoped IPv4: "127.0.0.53%lo:53"
pub(super) fn parse_address(address: &str) -> Option<SocketAddress> {
    let (addr, port_str, ipv6) = if let Some(rest) = address.strip_prefix('[') {
        let bracket_end = rest.find(']')?;
        let port_str = rest[bracket_end + 1..].strip_prefix(':')?;
        (&rest[..bracket_end], port_str, true)
    } else {
        let last_colon = address.rfind(':')?;
        (&address[..last_colon], &address[last_colon + 1..], false)
    };

    let port: u16 = port_str.parse().ok()?;
    let addr = addr.split('%').next().unwrap_or(addr);
    let addr = match addr {
        "" | "*" => "0.0.0.0",
        other => other,
    };

    Some(SocketAddress {
        address: addr.to_string(),
        port,
        ipv6,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_address() {
        let parsed = parse_address("127.0.0.1:3000").unwrap();
        assert_eq!(parsed.address, "127.0.0.1");
        assert_eq!(parsed.port, 3000);
        assert!(!parsed.ipv6);

        let parsed = parse_address("*:8080").unwrap();
        assert_eq!(parsed.address, "0.0.0.0");
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn test_parse_ipv6_address() {
        let parsed = parse_address("[::1]:3000").unwrap();
        assert_eq!(parsed.address, "::1");
        assert_eq!(parsed.port, 3000);
        assert!(parsed.ipv6);

        let parsed = parse_address("[fe80::1%eth0]:8080").unwrap();
        assert_eq!(parsed.address, "fe80::1");
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn test_parse_zone_scoped_ipv4() {
        let parsed = parse_address("127.0.0.53%lo:53").unwrap();
        assert_eq!(parsed.address, "127.0.0.53");
        assert_eq!(parsed.port, 53);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_address("no-port").is_none());
        assert!(parse_address("[::1]3000").is_none());
        assert!(parse_address("*:*").is_none());
    }
}
