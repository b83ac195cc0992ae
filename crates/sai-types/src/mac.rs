//! Ethernet MAC address with the classification used by L2 programming.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address class of a MAC, checked in the order an FDB entry is screened:
/// zero first, then broadcast, then multicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacClass {
    /// 00:00:00:00:00:00
    Zero,
    /// ff:ff:ff:ff:ff:ff
    Broadcast,
    /// Group bit (low bit of the first octet) set.
    Multicast,
    Unicast,
}

/// A 48-bit Ethernet MAC address.
///
/// ```
/// use sai_types::{MacAddress, MacClass};
///
/// let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
/// assert_eq!(mac.class(), MacClass::Unicast);
/// assert_eq!(MacAddress::BROADCAST.class(), MacClass::Broadcast);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub const fn is_zero(&self) -> bool {
        u64::from_be_bytes(self.widen()) == 0
    }

    pub const fn is_broadcast(&self) -> bool {
        u64::from_be_bytes(self.widen()) == 0xffff_ffff_ffff
    }

    /// Broadcast is also a multicast address under this test.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Classifies the address. Broadcast wins over multicast.
    pub const fn class(&self) -> MacClass {
        if self.is_zero() {
            MacClass::Zero
        } else if self.is_broadcast() {
            MacClass::Broadcast
        } else if self.is_multicast() {
            MacClass::Multicast
        } else {
            MacClass::Unicast
        }
    }

    const fn widen(&self) -> [u8; 8] {
        let b = self.0;
        [0, 0, b[0], b[1], b[2], b[3], b[4], b[5]]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());
        let separator = if s.contains('-') { '-' } else { ':' };

        let mut bytes = [0u8; 6];
        let mut parts = s.split(separator);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(mac: MacAddress) -> [u8; 6] {
        mac.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_separators() {
        let colon: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        let hyphen: MacAddress = "00-11-22-33-44-55".parse().unwrap();
        assert_eq!(colon, hyphen);
        assert_eq!(colon.as_bytes(), &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    }

    #[test]
    fn test_display_lowercase() {
        let mac = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(MacAddress::ZERO.class(), MacClass::Zero);
        assert_eq!(MacAddress::BROADCAST.class(), MacClass::Broadcast);
        assert_eq!(
            MacAddress::new([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]).class(),
            MacClass::Multicast
        );
        assert_eq!(
            MacAddress::new([0x33, 0x33, 0x00, 0x00, 0x00, 0x01]).class(),
            MacClass::Multicast
        );
        assert_eq!(
            MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]).class(),
            MacClass::Unicast
        );
    }

    #[test]
    fn test_broadcast_is_also_multicast() {
        assert!(MacAddress::BROADCAST.is_multicast());
        assert!(!MacAddress::ZERO.is_broadcast());
    }

    #[test]
    fn test_invalid_format() {
        assert!("invalid".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddress>().is_err());
        assert!("gg:11:22:33:44:55".parse::<MacAddress>().is_err());
        assert!("001:1:22:33:44:55".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = serde_json::from_str("\"00:e0:ec:01:02:03\"").unwrap();
        assert_eq!(mac.as_bytes()[5], 0x03);
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"00:e0:ec:01:02:03\"");
    }
}
