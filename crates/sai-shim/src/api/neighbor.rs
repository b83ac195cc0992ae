//! Neighbor entries.
//!
//! A neighbor binds an IP address on a router interface to the MAC it
//! resolves to. Entries live in the shim; next hops read them to build
//! their forwarding egress.

use std::net::IpAddr;

use sai_types::{MacAddress, MacClass};

use crate::attr::{attr_ids, check_get_list, find, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::SwitchSdk;
use crate::switch::{expect_type, SaiSwitch, SwitchContext};

use super::PacketAction;

attr_ids! {
    pub enum NeighborAttr {
        DstMacAddress => "SAI_NEIGHBOR_ATTR_DST_MAC_ADDRESS",
        PacketAction => "SAI_NEIGHBOR_ATTR_PACKET_ACTION",
        NoHostRoute => "SAI_NEIGHBOR_ATTR_NO_HOST_ROUTE",
    }
}

/// `sai_neighbor_entry_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeighborEntry {
    pub rif_id: Handle,
    pub ip_address: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    pub mac: MacAddress,
    pub action: PacketAction,
}

/// SDK interface id of the entry's router interface.
fn entry_rif(ctx: &SwitchContext, entry: &NeighborEntry) -> SaiResult<u32> {
    let rif = expect_type(entry.rif_id, ObjectType::RouterInterface)
        .map_err(|_| SaiError::invalid_parameter(format!("not a router interface: {:?}", entry.rif_id)))?;
    ctx.router_interfaces
        .get(rif)
        .map_err(|_| SaiError::invalid_parameter(format!("router interface {} does not exist", rif)))?;
    Ok(rif)
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_neighbor_entry(
        &mut self,
        entry: &NeighborEntry,
        attrs: &[Attribute<NeighborAttr>],
    ) -> SaiResult<()> {
        let (_, ctx) = self.parts_mut()?;
        let rif = entry_rif(ctx, entry)?;

        let mac = find(attrs, NeighborAttr::DstMacAddress)
            .ok_or(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_NEIGHBOR_ATTR_DST_MAC_ADDRESS",
            })?
            .as_mac()?;
        if mac.class() != MacClass::Unicast {
            return Err(SaiError::invalid_parameter(format!("neighbor MAC {} is not unicast", mac)));
        }

        let mut action = PacketAction::Forward;
        for attr in attrs {
            match attr.id {
                NeighborAttr::DstMacAddress => {}
                NeighborAttr::PacketAction => {
                    let raw = attr.as_s32()?;
                    action = PacketAction::from_s32(raw)
                        .ok_or_else(|| SaiError::invalid_parameter(format!("unknown packet action {}", raw)))?;
                    if action != PacketAction::Forward {
                        return Err(SaiError::not_supported(format!("neighbor action {:?}", action)));
                    }
                }
                NeighborAttr::NoHostRoute => {
                    debug_log!(SaiApi::Neighbor, attr = ?attr.id, "ignoring neighbor attribute");
                }
            }
        }

        let key = (rif, entry.ip_address);
        if ctx.neighbors.contains_key(&key) {
            return Err(SaiError::already_exists(format!("neighbor {} on rif {}", entry.ip_address, rif)));
        }
        ctx.neighbors.insert(key, NeighborRecord { mac, action });
        info_log!(SaiApi::Neighbor, rif, ip = %entry.ip_address, mac = %mac, "neighbor created");
        Ok(())
    }

    /// Fails with `ObjectInUse` while a next hop resolves through it.
    pub fn remove_neighbor_entry(&mut self, entry: &NeighborEntry) -> SaiResult<()> {
        let (_, ctx) = self.parts_mut()?;
        let rif = expect_type(entry.rif_id, ObjectType::RouterInterface)?;
        let key = (rif, entry.ip_address);
        if !ctx.neighbors.contains_key(&key) {
            return Err(SaiError::not_found(format!("neighbor {} on rif {}", entry.ip_address, rif)));
        }
        if ctx
            .next_hops
            .values()
            .any(|hop| hop.rif == rif && hop.ip == entry.ip_address)
        {
            return Err(SaiError::object_in_use(format!("neighbor {} on rif {}", entry.ip_address, rif)));
        }
        ctx.neighbors.remove(&key);
        info_log!(SaiApi::Neighbor, rif, ip = %entry.ip_address, "neighbor removed");
        Ok(())
    }

    /// Removes every neighbor. Nothing is removed while any next hop exists.
    pub fn remove_all_neighbor_entries(&mut self) -> SaiResult<()> {
        let (_, ctx) = self.parts_mut()?;
        if !ctx.next_hops.is_empty() {
            warn_log!(SaiApi::Neighbor, next_hops = ctx.next_hops.len(), "neighbors still referenced");
            return Err(SaiError::object_in_use("neighbors referenced by next hops"));
        }
        let count = ctx.neighbors.len();
        ctx.neighbors.clear();
        info_log!(SaiApi::Neighbor, count, "all neighbors removed");
        Ok(())
    }

    pub fn set_neighbor_attribute(&mut self, _entry: &NeighborEntry, attr: &Attribute<NeighborAttr>) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("neighbor set {:?}", attr.id)))
    }

    pub fn get_neighbor_attribute(&self, entry: &NeighborEntry, attrs: &mut [Attribute<NeighborAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let rif = expect_type(entry.rif_id, ObjectType::RouterInterface)?;
        let record = ctx
            .neighbors
            .get(&(rif, entry.ip_address))
            .ok_or_else(|| SaiError::not_found(format!("neighbor {} on rif {}", entry.ip_address, rif)))?;
        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                NeighborAttr::DstMacAddress => AttributeValue::Mac(record.mac),
                NeighborAttr::PacketAction => AttributeValue::S32(record.action as i32),
                NeighborAttr::NoHostRoute => AttributeValue::Bool(false),
            };
        }
        Ok(())
    }
}
