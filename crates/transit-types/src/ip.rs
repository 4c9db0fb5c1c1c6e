//! CIDR prefixes owned by attachments and carried by static routes.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP prefix in canonical CIDR notation (e.g. 10.1.0.0/16 or 2001:db8::/32).
///
/// Host bits below the prefix length must be zero; the provisioning layer
/// rejects routes whose destination is not a network address, so the check
/// happens at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    network: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a prefix from a network address and a length.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidIpPrefix`] if the length exceeds the
    /// address width, and [`ParseError::NonCanonicalPrefix`] if host bits are
    /// set.
    pub fn new(network: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let width = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > width {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{}: length exceeds {}",
                network, prefix_len, width
            )));
        }

        let prefix = IpPrefix {
            network,
            prefix_len,
        };
        if prefix.masked() != network {
            return Err(ParseError::NonCanonicalPrefix(prefix.to_string()));
        }
        Ok(prefix)
    }

    pub const fn network(&self) -> IpAddr {
        self.network
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv4(&self) -> bool {
        self.network.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.network.is_ipv6()
    }

    /// Returns true if `addr` falls inside this prefix.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V4(a)) => {
                u32::from(a) & v4_mask(self.prefix_len) == u32::from(self.v4_network())
            }
            (IpAddr::V6(_), IpAddr::V6(a)) => {
                u128::from(a) & v6_mask(self.prefix_len) == u128::from(self.v6_network())
            }
            _ => false,
        }
    }

    /// Returns true if the two prefixes share any address.
    pub fn overlaps(&self, other: &IpPrefix) -> bool {
        if self.prefix_len <= other.prefix_len {
            self.contains(other.network)
        } else {
            other.contains(self.network)
        }
    }

    fn masked(&self) -> IpAddr {
        match self.network {
            IpAddr::V4(a) => IpAddr::V4(Ipv4Addr::from(u32::from(a) & v4_mask(self.prefix_len))),
            IpAddr::V6(a) => IpAddr::V6(Ipv6Addr::from(u128::from(a) & v6_mask(self.prefix_len))),
        }
    }

    fn v4_network(&self) -> Ipv4Addr {
        match self.network {
            IpAddr::V4(a) => a,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        }
    }

    fn v6_network(&self) -> Ipv6Addr {
        match self.network {
            IpAddr::V6(a) => a,
            IpAddr::V4(_) => Ipv6Addr::UNSPECIFIED,
        }
    }
}

fn v4_mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(len))
    }
}

fn v6_mask(len: u8) -> u128 {
    if len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(len))
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .trim()
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let network: IpAddr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        IpPrefix::new(network, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> Self {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_v4_and_v6() {
        let v4: IpPrefix = "10.1.0.0/16".parse().unwrap();
        assert!(v4.is_ipv4());
        assert_eq!(v4.prefix_len(), 16);

        let v6: IpPrefix = "2001:db8::/32".parse().unwrap();
        assert!(v6.is_ipv6());
        assert_eq!(v6.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_rejects_host_bits() {
        assert_eq!(
            "10.1.2.3/16".parse::<IpPrefix>(),
            Err(ParseError::NonCanonicalPrefix("10.1.2.3/16".to_string()))
        );
        assert!("2001:db8::1/64".parse::<IpPrefix>().is_err());
    }

    #[test]
    fn test_rejects_bad_length_and_format() {
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("2001:db8::/129".parse::<IpPrefix>().is_err());
        assert!("10.0.0.0".parse::<IpPrefix>().is_err());
        assert!("ten/8".parse::<IpPrefix>().is_err());
    }

    #[test]
    fn test_default_route_is_canonical() {
        let default: IpPrefix = "0.0.0.0/0".parse().unwrap();
        assert_eq!(default.prefix_len(), 0);
        assert!(default.contains("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_contains_and_overlaps() {
        let wide: IpPrefix = "10.0.0.0/8".parse().unwrap();
        let narrow: IpPrefix = "10.2.0.0/16".parse().unwrap();
        let other: IpPrefix = "172.16.0.0/12".parse().unwrap();

        assert!(wide.contains("10.2.3.4".parse().unwrap()));
        assert!(!narrow.contains("10.3.0.1".parse().unwrap()));
        assert!(wide.overlaps(&narrow));
        assert!(narrow.overlaps(&wide));
        assert!(!wide.overlaps(&other));
    }

    #[test]
    fn test_ordering_is_stable() {
        let mut prefixes: Vec<IpPrefix> = ["10.2.0.0/16", "10.1.0.0/16", "10.1.0.0/24"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        prefixes.sort();
        let rendered: Vec<String> = prefixes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["10.1.0.0/16", "10.1.0.0/24", "10.2.0.0/16"]);
    }
}
