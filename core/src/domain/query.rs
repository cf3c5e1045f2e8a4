//! Port query parsing.
//!
//! Grammar: `[interface:](port | start-end)`. The input is split at the last
//! colon; a non-empty, non-numeric prefix names the interface.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated (interface, port range) filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Bound address to match, `None` for any interface.
    pub interface: Option<String>,
    /// First port of the range (inclusive).
    pub start_port: u16,
    /// Last port of the range (inclusive). Equal to `start_port` for a single port.
    pub end_port: u16,
}

impl Query {
    /// Parse a query string such as `:3000`, `8080-8090` or `localhost:5432`.
    pub fn parse(arg: &str) -> Result<Self> {
        if arg.is_empty() {
            return Err(Error::InvalidQuery("empty port argument".to_string()));
        }

        let (interface, port_part) = match arg.rfind(':') {
            Some(idx) => {
                let prefix = &arg[..idx];
                let interface = if !prefix.is_empty() && prefix.parse::<i64>().is_err() {
                    Some(prefix.to_string())
                } else {
                    None
                };
                (interface, &arg[idx + 1..])
            }
            None => (None, arg),
        };

        if port_part.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "missing port number in {:?}",
                arg
            )));
        }

        let (start_port, end_port) = parse_port_range(port_part).map_err(|reason| {
            Error::InvalidQuery(format!("invalid port in {:?}: {}", arg, reason))
        })?;

        Ok(Self {
            interface,
            start_port,
            end_port,
        })
    }

    /// A query for a single port on any interface.
    pub fn port(port: u16) -> Self {
        Self {
            interface: None,
            start_port: port,
            end_port: port,
        }
    }

    /// The maximal query: every port, any interface.
    pub fn all() -> Self {
        Self {
            interface: None,
            start_port: 1,
            end_port: u16::MAX,
        }
    }

    /// Whether this query targets exactly one port.
    pub fn is_single_port(&self) -> bool {
        self.start_port == self.end_port
    }

    /// Whether `port` falls within the range.
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start_port && port <= self.end_port
    }

    /// Whether a socket bound to `address` matches the interface filter.
    ///
    /// Wildcard binds accept connections on every interface and always match.
    pub fn matches_interface(&self, address: &str) -> bool {
        match self.interface.as_deref() {
            None | Some("") => true,
            Some(iface) => address == iface || is_wildcard(address),
        }
    }

    /// Whether a listener on `address:port` satisfies this query.
    pub fn matches(&self, address: &str, port: u16) -> bool {
        self.contains(port) && self.matches_interface(address)
    }
}

impl FromStr for Query {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let iface = self.interface.as_deref().unwrap_or("");
        if self.is_single_port() {
            write!(f, "{}:{}", iface, self.start_port)
        } else {
            write!(f, "{}:{}-{}", iface, self.start_port, self.end_port)
        }
    }
}

/// Addresses that stand for "every interface".
pub fn is_wildcard(address: &str) -> bool {
    matches!(address, "0.0.0.0" | "::" | "*")
}

fn parse_port_range(s: &str) -> std::result::Result<(u16, u16), String> {
    match s.find('-') {
        Some(idx) => {
            let start = parse_port(&s[..idx])?;
            let end = parse_port(&s[idx + 1..])?;
            if start > end {
                return Err(format!(
                    "invalid range: start port {} > end port {}",
                    start, end
                ));
            }
            Ok((start, end))
        }
        None => {
            let port = parse_port(s)?;
            Ok((port, port))
        }
    }
}

fn parse_port(s: &str) -> std::result::Result<u16, String> {
    let port: i64 = s
        .parse()
        .map_err(|_| format!("{:?} is not a valid port number", s))?;
    if !(1..=65535).contains(&port) {
        return Err(format!("port {} out of range (1-65535)", port));
    }
    Ok(port as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_port_forms() {
        for p in [1u16, 80, 3000, 65535] {
            for arg in [p.to_string(), format!(":{}", p)] {
                let q = Query::parse(&arg).unwrap();
                assert_eq!(q.interface, None);
                assert_eq!(q.start_port, p);
                assert_eq!(q.end_port, p);
                assert!(q.is_single_port());
            }
        }
    }

    #[test]
    fn test_port_range() {
        let q = Query::parse(":8080-8090").unwrap();
        assert_eq!(q.interface, None);
        assert_eq!(q.start_port, 8080);
        assert_eq!(q.end_port, 8090);
        assert!(!q.is_single_port());

        let q = Query::parse("3000-3000").unwrap();
        assert!(q.is_single_port());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = Query::parse(":9000-8000").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_interface_prefix() {
        let q = Query::parse("localhost:5432").unwrap();
        assert_eq!(q.interface.as_deref(), Some("localhost"));
        assert_eq!(q.start_port, 5432);
        assert_eq!(q.end_port, 5432);

        let q = Query::parse("0.0.0.0:80").unwrap();
        assert_eq!(q.interface.as_deref(), Some("0.0.0.0"));

        let q = Query::parse("127.0.0.1:8000-8100").unwrap();
        assert_eq!(q.interface.as_deref(), Some("127.0.0.1"));
        assert_eq!((q.start_port, q.end_port), (8000, 8100));
    }

    #[test]
    fn test_numeric_prefix_is_not_interface() {
        let q = Query::parse("3000:4000").unwrap();
        assert_eq!(q.interface, None);
        assert_eq!(q.start_port, 4000);
    }

    #[test]
    fn test_invalid_queries() {
        for arg in [":0", ":65536", ":abc", "", ":", "localhost:", ":80-", ":-80", "abc"] {
            assert!(
                matches!(Query::parse(arg), Err(Error::InvalidQuery(_))),
                "expected {:?} to be rejected",
                arg
            );
        }
    }

    #[test]
    fn test_contains() {
        let q = Query::parse(":8080-8090").unwrap();
        assert!(q.contains(8080));
        assert!(q.contains(8085));
        assert!(q.contains(8090));
        assert!(!q.contains(8079));
        assert!(!q.contains(8091));
    }

    #[test]
    fn test_matches_interface() {
        let q = Query::parse("127.0.0.1:80").unwrap();
        assert!(q.matches_interface("127.0.0.1"));
        assert!(q.matches_interface("0.0.0.0"));
        assert!(q.matches_interface("::"));
        assert!(!q.matches_interface("192.168.1.10"));

        let any = Query::port(80);
        assert!(any.matches_interface("192.168.1.10"));
    }

    #[test]
    fn test_all() {
        let q = Query::all();
        assert!(q.contains(1));
        assert!(q.contains(65535));
        assert_eq!(q.interface, None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Query::parse("3000").unwrap().to_string(), ":3000");
        assert_eq!(
            Query::parse("localhost:8080-8090").unwrap().to_string(),
            "localhost:8080-8090"
        );
    }
}
