//! VLAN identifier.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier.
///
/// 0 (priority tagged) and 4095 are reserved, so the usable range is 1-4094.
///
/// ```
/// use sai_types::VlanId;
///
/// assert_eq!(VlanId::new(100).unwrap().as_u16(), 100);
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    /// VLAN every port belongs to after switch bring-up.
    pub const DEFAULT: VlanId = VlanId(1);

    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id as u32))
        }
    }

    /// Validates a raw attribute value, which SAI carries wider than 12 bits.
    pub fn from_raw(id: u32) -> Result<Self, ParseError> {
        u16::try_from(id)
            .map_err(|_| ParseError::InvalidVlanId(id))
            .and_then(VlanId::new)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    pub const fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidVlanId(0))?;
        VlanId::from_raw(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}
