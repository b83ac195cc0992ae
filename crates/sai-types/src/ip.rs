//! IP route prefix.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A destination prefix in CIDR notation (e.g. 10.0.0.0/24 or 2001:db8::/32).
///
/// Host bits are kept as given; [`IpPrefix::network`] masks them off when the
/// caller needs the canonical network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    address: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let max_len = Self::max_len(&address);
        if prefix_len > max_len {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds {} for {}",
                prefix_len, max_len, address
            )));
        }
        Ok(IpPrefix {
            address,
            prefix_len,
        })
    }

    pub const fn address(&self) -> IpAddr {
        self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv6(&self) -> bool {
        self.address.is_ipv6()
    }

    /// Netmask with `prefix_len` leading one bits, in the prefix's family.
    pub fn mask(&self) -> IpAddr {
        match self.address {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(Self::v4_mask(self.prefix_len))),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(Self::v6_mask(self.prefix_len))),
        }
    }

    /// Address with host bits cleared.
    pub fn network(&self) -> IpAddr {
        match self.address {
            IpAddr::V4(a) => IpAddr::V4(Ipv4Addr::from(u32::from(a) & Self::v4_mask(self.prefix_len))),
            IpAddr::V6(a) => {
                IpAddr::V6(Ipv6Addr::from(u128::from(a) & Self::v6_mask(self.prefix_len)))
            }
        }
    }

    fn max_len(address: &IpAddr) -> u8 {
        if address.is_ipv4() {
            32
        } else {
            128
        }
    }

    fn v4_mask(len: u8) -> u32 {
        32u32
            .checked_sub(u32::from(len))
            .and_then(|shift| u32::MAX.checked_shl(shift))
            .unwrap_or(0)
    }

    fn v6_mask(len: u8) -> u128 {
        128u32
            .checked_sub(u32::from(len))
            .and_then(|shift| u128::MAX.checked_shl(shift))
            .unwrap_or(0)
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = match s.rsplit_once('/') {
            Some(parts) => parts,
            None => {
                // Bare address means a host route.
                let address: IpAddr = s
                    .parse()
                    .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))?;
                let len = Self::max_len(&address);
                return IpPrefix::new(address, len);
            }
        };

        let address: IpAddr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        IpPrefix::new(address, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> String {
        prefix.to_string()
    }
}
