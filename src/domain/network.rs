// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Cannot carve {count} /{prefix} subnets out of {parent}")]
    SubnetsDoNotFit {
        parent: String,
        prefix: u8,
        count: usize,
    },
}

/// IPv4 block in CIDR notation
///
/// Invariants:
/// - Valid dotted-quad address
/// - Prefix length present and within 0-32
///
/// # Examples
///
/// ```rust
/// use twin_stack::domain::Ipv4Cidr;
///
/// let block = Ipv4Cidr::new("10.0.0.0/8").unwrap();
/// assert_eq!(block.prefix_length(), 8);
/// assert!(Ipv4Cidr::new("10.0.0.0").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// The block matching every IPv4 address
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_length: 0,
    };

    /// Parse a CIDR block such as `10.0.0.0/16`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length)
    }

    /// Create from separate address and prefix
    pub fn from_parts(address: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// Get the address part as written
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Get the prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// First address of the block (host bits cleared)
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask())
    }

    /// Whether this block matches every IPv4 address
    pub fn is_any(&self) -> bool {
        self.prefix_length == 0
    }

    /// Whether `addr` falls inside this block
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == u32::from(self.network())
    }

    /// Carve `count` consecutive `/prefix` blocks from the start of this block
    pub fn subnets(&self, prefix: u8, count: usize) -> Result<Vec<Ipv4Cidr>, NetworkError> {
        if prefix > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix));
        }

        let available = if prefix < self.prefix_length {
            0
        } else {
            1u64 << (prefix - self.prefix_length)
        };
        if (count as u64) > available {
            return Err(NetworkError::SubnetsDoNotFit {
                parent: self.as_cidr(),
                prefix,
                count,
            });
        }

        let base = u64::from(u32::from(self.network()));
        let step = 1u64 << (32 - prefix);

        (0..count as u64)
            .map(|i| {
                // Bounded by the fit check above
                let start = (base + i * step) as u32;
                Self::from_parts(Ipv4Addr::from(start), prefix)
            })
            .collect()
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_length)
    }

    fn mask(&self) -> u32 {
        if self.prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_length)
        }
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.as_cidr()
    }
}

/// TCP port or ICMP selector used by ingress rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSpec {
    /// A single TCP port
    Tcp(u16),
    /// Every ICMP type and code
    AllIcmp,
}

impl PortSpec {
    /// SSH
    pub const SSH: PortSpec = PortSpec::Tcp(22);
    /// Plain HTTP
    pub const HTTP: PortSpec = PortSpec::Tcp(80);
    /// HTTPS
    pub const HTTPS: PortSpec = PortSpec::Tcp(443);

    /// IP protocol name as the provider spells it
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Tcp(_) => "tcp",
            Self::AllIcmp => "icmp",
        }
    }

    /// `(FromPort, ToPort)`; ICMP uses -1 for all types and codes
    pub fn range(&self) -> (i32, i32) {
        match self {
            Self::Tcp(port) => (i32::from(*port), i32::from(*port)),
            Self::AllIcmp => (-1, -1),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(port) => write!(f, "tcp/{}", port),
            Self::AllIcmp => write!(f, "icmp/all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_parsing() {
        let cidr = Ipv4Cidr::new("10.0.0.0/8").unwrap();
        assert_eq!(cidr.address().to_string(), "10.0.0.0");
        assert_eq!(cidr.prefix_length(), 8);
        assert_eq!(cidr.as_cidr(), "10.0.0.0/8");
        assert!(!cidr.is_any());
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(Ipv4Cidr::new("10.0.0.0").is_err()); // No prefix
        assert!(Ipv4Cidr::new("999.0.0.0/8").is_err());
        assert!(Ipv4Cidr::new("10.0.0.0/33").is_err());
        assert!(Ipv4Cidr::new("10.0.0.0/x").is_err());
        assert!(Ipv4Cidr::new("2001:db8::/32").is_err()); // IPv4 only
    }

    #[test]
    fn test_any_block() {
        assert_eq!(Ipv4Cidr::ANY.as_cidr(), "0.0.0.0/0");
        assert!(Ipv4Cidr::ANY.is_any());
        assert!(Ipv4Cidr::ANY.contains(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_network_and_contains() {
        let cidr = Ipv4Cidr::new("192.168.1.77/24").unwrap();
        assert_eq!(cidr.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert!(cidr.contains(Ipv4Addr::new(192, 168, 1, 200)));
        assert!(!cidr.contains(Ipv4Addr::new(192, 168, 2, 1)));
    }

    #[test]
    fn test_subnet_derivation() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let subnets = vpc.subnets(24, 2).unwrap();
        let rendered: Vec<String> = subnets.iter().map(|s| s.as_cidr()).collect();
        assert_eq!(rendered, vec!["10.0.0.0/24", "10.0.1.0/24"]);
    }

    #[test]
    fn test_subnets_that_do_not_fit() {
        let small = Ipv4Cidr::new("10.0.0.0/24").unwrap();
        assert!(matches!(
            small.subnets(25, 3),
            Err(NetworkError::SubnetsDoNotFit { .. })
        ));
        assert!(small.subnets(16, 1).is_err()); // Larger than parent
        assert!(small.subnets(33, 1).is_err());
    }

    #[test]
    fn test_cidr_serde_roundtrip_as_string() {
        let cidr = Ipv4Cidr::new("172.16.0.0/12").unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"172.16.0.0/12\"");
        let back: Ipv4Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr);
    }

    #[test]
    fn test_port_spec() {
        assert_eq!(PortSpec::HTTP.range(), (80, 80));
        assert_eq!(PortSpec::AllIcmp.range(), (-1, -1));
        assert_eq!(PortSpec::AllIcmp.protocol(), "icmp");
        assert_eq!(PortSpec::Tcp(8000).to_string(), "tcp/8000");
    }
}
