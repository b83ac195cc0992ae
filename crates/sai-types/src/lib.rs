//! Network value types shared by the SAI shim.
//!
//! - [`MacAddress`]: 48-bit Ethernet addresses, classified the way FDB
//!   programming needs them (zero, broadcast, multicast, unicast)
//! - [`VlanId`]: IEEE 802.1Q identifiers restricted to 1-4094
//! - [`IpPrefix`]: route destinations with mask derivation

mod ip;
mod mac;
mod vlan;

pub use ip::IpPrefix;
pub use mac::{MacAddress, MacClass};
pub use vlan::VlanId;

/// Error returned when a textual or numeric value does not describe a valid
/// network type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u32),
}
