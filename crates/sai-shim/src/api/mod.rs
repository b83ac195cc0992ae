//! Per-object SAI APIs.
//!
//! Each module declares its attribute ids and records and adds an
//! `impl<S: SwitchSdk> SaiSwitch<S>` block with the create/remove/set/get
//! entry points for that object. All of them check that the switch is
//! initialized before anything else.

pub mod buffer;
pub mod fdb;
pub mod neighbor;
pub mod next_hop;
pub mod next_hop_group;
pub mod port;
pub mod queue;
pub mod route;
pub mod router_interface;
pub mod scheduler;
pub mod virtual_router;
pub mod vlan;

/// `sai_packet_action_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketAction {
    Drop = 0,
    Forward = 1,
    Copy = 2,
    CopyCancel = 3,
    Trap = 4,
    Log = 5,
    Deny = 6,
    Transit = 7,
}

impl PacketAction {
    pub fn from_s32(raw: i32) -> Option<Self> {
        let action = match raw {
            0 => PacketAction::Drop,
            1 => PacketAction::Forward,
            2 => PacketAction::Copy,
            3 => PacketAction::CopyCancel,
            4 => PacketAction::Trap,
            5 => PacketAction::Log,
            6 => PacketAction::Deny,
            7 => PacketAction::Transit,
            _ => return None,
        };
        Some(action)
    }
}
