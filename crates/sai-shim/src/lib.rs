//! SAI shim over a switch-ASIC SDK.
//!
//! Translates SAI object-model calls (create/remove/set/get on VLANs, routes,
//! schedulers, buffers, FDB entries and friends) into calls against a vendor
//! SDK reached through the [`sdk::SwitchSdk`] trait. The shim keeps only small
//! id → record tables and forwards SDK events to the host.
//!
//! ```ignore
//! use std::sync::Arc;
//! use sai_shim::{sdk::sim::SimulatedSdk, SaiSwitch, SwitchProfile};
//!
//! let mut switch = SaiSwitch::new(Arc::new(SimulatedSdk::default()));
//! switch.initialize("unit0", SwitchProfile::default(), host_callbacks)?;
//! switch.create_vlan(100)?;
//! let vr = switch.create_virtual_router(&[])?;
//! ```

#[macro_use]
pub mod logging;

pub mod api;
pub mod attr;
pub mod error;
pub mod handle;
pub mod notify;
pub mod profile;
pub mod sdk;
pub mod switch;
pub mod table;

pub use attr::{AttrId, Attribute, AttributeValue};
pub use error::{to_status, SaiError, SaiResult, SaiStatus};
pub use handle::{Handle, ObjectType, QueueType, RawSaiObjectId};
pub use logging::{init_logging, log_set, SaiApi, SaiLogLevel};
pub use notify::{
    FdbEventNotification, FdbEventType, PortOperStatus, PortOperStatusNotification,
    SwitchNotifications, SwitchOperStatus,
};
pub use profile::{BootType, ProfileError, SwitchProfile};
pub use switch::{SaiSwitch, SwitchState};
