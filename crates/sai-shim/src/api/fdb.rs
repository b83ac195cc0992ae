//! FDB (L2 table) entries.
//!
//! Entries are keyed by MAC and VLAN and live only in the SDK's L2 table.
//! Setting an attribute reads the SDK entry back, changes it and writes it
//! with `replace`.

use sai_types::{MacAddress, MacClass, VlanId};

use crate::attr::{attr_ids, check_get_list, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{L2Action, L2Addr, SwitchSdk};
use crate::switch::{SaiSwitch, SwitchContext};

use super::PacketAction;

/// `sai_fdb_entry_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FdbEntry {
    pub mac: MacAddress,
    pub vlan: u16,
}

attr_ids! {
    pub enum FdbEntryAttr {
        Type => "SAI_FDB_ENTRY_ATTR_TYPE",
        PortId => "SAI_FDB_ENTRY_ATTR_PORT_ID",
        PacketAction => "SAI_FDB_ENTRY_ATTR_PACKET_ACTION",
    }
}

attr_ids! {
    pub enum FdbFlushAttr {
        PortId => "SAI_FDB_FLUSH_ATTR_PORT_ID",
        VlanId => "SAI_FDB_FLUSH_ATTR_VLAN_ID",
        EntryType => "SAI_FDB_FLUSH_ATTR_ENTRY_TYPE",
    }
}

/// `sai_fdb_entry_type_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FdbEntryType {
    #[default]
    Dynamic = 0,
    Static = 1,
}

impl FdbEntryType {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(FdbEntryType::Dynamic),
            1 => Some(FdbEntryType::Static),
            _ => None,
        }
    }
}

fn l2_action(action: PacketAction) -> SaiResult<L2Action> {
    match action {
        PacketAction::Forward => Ok(L2Action::Forward),
        PacketAction::Drop => Ok(L2Action::DiscardDst),
        PacketAction::Trap => Ok(L2Action::Trap),
        PacketAction::Log => Ok(L2Action::CopyToCpu),
        other => Err(SaiError::invalid_parameter(format!(
            "FDB packet action {:?}",
            other
        ))),
    }
}

fn packet_action(action: L2Action) -> PacketAction {
    match action {
        L2Action::Forward => PacketAction::Forward,
        L2Action::DiscardSrc | L2Action::DiscardDst => PacketAction::Drop,
        L2Action::Trap => PacketAction::Trap,
        L2Action::CopyToCpu => PacketAction::Log,
    }
}

fn check_entry(entry: &FdbEntry) -> SaiResult<()> {
    match entry.mac.class() {
        MacClass::Unicast => {}
        MacClass::Zero => {
            return Err(SaiError::invalid_parameter("zero MAC in FDB entry"));
        }
        MacClass::Broadcast | MacClass::Multicast => {
            return Err(SaiError::not_supported(format!("FDB entry for {}", entry.mac)));
        }
    }
    VlanId::new(entry.vlan).map_err(|_| SaiError::InvalidVlanId {
        vlan: entry.vlan.into(),
    })?;
    Ok(())
}

/// Applies one attribute to an SDK entry.
fn apply(ctx: &SwitchContext, addr: &mut L2Addr, attr: &Attribute<FdbEntryAttr>) -> SaiResult<()> {
    match attr.id {
        FdbEntryAttr::Type => {
            let raw = attr.as_s32()?;
            let kind = FdbEntryType::from_s32(raw)
                .ok_or_else(|| SaiError::invalid_parameter(format!("FDB entry type {}", raw)))?;
            addr.is_static = kind == FdbEntryType::Static;
        }
        FdbEntryAttr::PortId => addr.port = ctx.port_from_handle(attr.as_oid()?)?,
        FdbEntryAttr::PacketAction => {
            let raw = attr.as_s32()?;
            let action = PacketAction::from_s32(raw)
                .ok_or_else(|| SaiError::invalid_parameter(format!("packet action {}", raw)))?;
            addr.action = l2_action(action)?;
        }
    }
    Ok(())
}

impl<S: SwitchSdk> SaiSwitch<S> {
    /// `PORT_ID` is required; type defaults to dynamic and action to forward.
    pub fn create_fdb_entry(&mut self, entry: &FdbEntry, attrs: &[Attribute<FdbEntryAttr>]) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        check_entry(entry)?;
        if crate::attr::find(attrs, FdbEntryAttr::PortId).is_none() {
            return Err(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_FDB_ENTRY_ATTR_PORT_ID",
            });
        }

        let mut addr = L2Addr {
            mac: entry.mac,
            vlan: entry.vlan,
            port: 0,
            is_static: false,
            action: L2Action::Forward,
            replace: false,
        };
        for attr in attrs {
            apply(ctx, &mut addr, attr)?;
        }

        sdk.l2_addr_add(&addr).map_err(|e| {
            warn_log!(SaiApi::Fdb, mac = %entry.mac, vlan = entry.vlan, error = %e, "FDB add failed");
            SaiError::sdk("l2_addr_add")(e)
        })?;
        debug_log!(SaiApi::Fdb, mac = %entry.mac, vlan = entry.vlan, port = addr.port, "FDB entry created");
        Ok(())
    }

    pub fn remove_fdb_entry(&mut self, entry: &FdbEntry) -> SaiResult<()> {
        let (sdk, _) = self.parts_mut()?;
        check_entry(entry)?;
        sdk.l2_addr_delete(entry.mac, entry.vlan)
            .map_err(SaiError::sdk("l2_addr_delete"))?;
        debug_log!(SaiApi::Fdb, mac = %entry.mac, vlan = entry.vlan, "FDB entry removed");
        Ok(())
    }

    pub fn set_fdb_entry_attribute(&mut self, entry: &FdbEntry, attr: &Attribute<FdbEntryAttr>) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        check_entry(entry)?;
        let mut addr = sdk
            .l2_addr_get(entry.mac, entry.vlan)
            .map_err(SaiError::sdk("l2_addr_get"))?;
        apply(ctx, &mut addr, attr)?;
        addr.replace = true;
        sdk.l2_addr_add(&addr).map_err(SaiError::sdk("l2_addr_add"))
    }

    pub fn get_fdb_entry_attribute(&self, entry: &FdbEntry, attrs: &mut [Attribute<FdbEntryAttr>]) -> SaiResult<()> {
        self.context()?;
        check_get_list(attrs)?;
        check_entry(entry)?;
        let addr = self
            .sdk()
            .l2_addr_get(entry.mac, entry.vlan)
            .map_err(SaiError::sdk("l2_addr_get"))?;

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                FdbEntryAttr::Type => {
                    let kind = if addr.is_static {
                        FdbEntryType::Static
                    } else {
                        FdbEntryType::Dynamic
                    };
                    AttributeValue::S32(kind as i32)
                }
                FdbEntryAttr::PortId => AttributeValue::Oid(Handle::encode(ObjectType::Port, addr.port)),
                FdbEntryAttr::PacketAction => AttributeValue::S32(packet_action(addr.action) as i32),
            };
        }
        Ok(())
    }

    pub fn flush_fdb_entries(&mut self, _attrs: &[Attribute<FdbFlushAttr>]) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented("FDB flush"))
    }
}
