//! Router interfaces.
//!
//! A router interface is an SDK L3 interface plus an L2 station entry so
//! frames addressed to the router MAC are routed. VLAN interfaces sit on an
//! existing VLAN. Port interfaces get a VLAN of their own: the highest
//! unused id is borrowed, the port becomes its only (untagged) member and
//! leaves the default VLAN. Removing the interface gives the VLAN back.

use sai_types::{MacAddress, VlanId};

use crate::attr::{attr_ids, check_get_list, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{L2Station, L3Intf, SdkError, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch, SwitchContext};

use super::virtual_router::L3_INTF_TTL;

attr_ids! {
    pub enum RouterInterfaceAttr {
        VirtualRouterId => "SAI_ROUTER_INTERFACE_ATTR_VIRTUAL_ROUTER_ID",
        Type => "SAI_ROUTER_INTERFACE_ATTR_TYPE",
        PortId => "SAI_ROUTER_INTERFACE_ATTR_PORT_ID",
        VlanId => "SAI_ROUTER_INTERFACE_ATTR_VLAN_ID",
        SrcMacAddress => "SAI_ROUTER_INTERFACE_ATTR_SRC_MAC_ADDRESS",
        AdminV4State => "SAI_ROUTER_INTERFACE_ATTR_ADMIN_V4_STATE",
        AdminV6State => "SAI_ROUTER_INTERFACE_ATTR_ADMIN_V6_STATE",
        Mtu => "SAI_ROUTER_INTERFACE_ATTR_MTU",
    }
}

/// `sai_router_interface_type_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterInterfaceType {
    Port = 0,
    Vlan = 1,
    Loopback = 2,
}

impl RouterInterfaceType {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(RouterInterfaceType::Port),
            1 => Some(RouterInterfaceType::Vlan),
            2 => Some(RouterInterfaceType::Loopback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterInterfaceRecord {
    pub rif_type: RouterInterfaceType,
    /// SDK port, for port interfaces.
    pub port: Option<u32>,
    /// VLAN the interface is on. Borrowed for port interfaces.
    pub vlan: u16,
    pub mac: MacAddress,
    pub vrf: u32,
    pub station_id: u32,
    /// Station and L3 interface are gone; only the borrowed VLAN is left
    /// to return.
    pub(crate) detached: bool,
}

impl RouterInterfaceRecord {
    fn station(&self) -> L2Station {
        L2Station {
            mac: self.mac,
            vlan: if self.port.is_some() { 0 } else { self.vlan },
            ipv4: true,
            ipv6: true,
        }
    }
}

/// Parsed create request.
struct RifRequest {
    rif_type: RouterInterfaceType,
    vrf: u32,
    port: Option<u32>,
    vlan: Option<u16>,
    mac: Option<MacAddress>,
}

fn parse_request(ctx: &SwitchContext, attrs: &[Attribute<RouterInterfaceAttr>]) -> SaiResult<RifRequest> {
    let rif_type = match crate::attr::find(attrs, RouterInterfaceAttr::Type) {
        Some(attr) => {
            let raw = attr.as_s32()?;
            RouterInterfaceType::from_s32(raw).ok_or_else(|| {
                SaiError::invalid_parameter(format!("unknown router interface type {}", raw))
            })?
        }
        None => {
            return Err(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_ROUTER_INTERFACE_ATTR_TYPE",
            })
        }
    };
    if rif_type == RouterInterfaceType::Loopback {
        return Err(SaiError::not_supported("loopback router interface"));
    }

    let mut vrf = None;
    let mut port = None;
    let mut vlan = None;
    let mut mac = None;
    for attr in attrs {
        match attr.id {
            RouterInterfaceAttr::Type => {}
            RouterInterfaceAttr::VirtualRouterId => {
                let handle = attr.as_oid()?;
                let id = expect_type(handle, ObjectType::VirtualRouter).map_err(|_| {
                    SaiError::invalid_parameter(format!("not a virtual router: {:?}", handle))
                })?;
                ctx.check_vrf(id)?;
                vrf = Some(id);
            }
            RouterInterfaceAttr::PortId => {
                if rif_type != RouterInterfaceType::Port {
                    return Err(SaiError::invalid_parameter("PORT_ID on a non-port interface"));
                }
                port = Some(ctx.port_from_handle(attr.as_oid()?)?);
            }
            RouterInterfaceAttr::VlanId => {
                if rif_type != RouterInterfaceType::Vlan {
                    return Err(SaiError::invalid_parameter("VLAN_ID on a non-VLAN interface"));
                }
                let raw = attr.as_u16()?;
                let id = VlanId::new(raw).map_err(|_| SaiError::InvalidVlanId { vlan: raw.into() })?;
                vlan = Some(id.as_u16());
            }
            RouterInterfaceAttr::SrcMacAddress => mac = Some(attr.as_mac()?),
            RouterInterfaceAttr::AdminV4State
            | RouterInterfaceAttr::AdminV6State
            | RouterInterfaceAttr::Mtu => {
                debug_log!(SaiApi::RouterInterface, attr = ?attr.id, "ignoring router interface attribute");
            }
        }
    }

    let vrf = vrf.ok_or(SaiError::MandatoryAttributeMissing {
        attribute: "SAI_ROUTER_INTERFACE_ATTR_VIRTUAL_ROUTER_ID",
    })?;
    match rif_type {
        RouterInterfaceType::Port if port.is_none() => Err(SaiError::MandatoryAttributeMissing {
            attribute: "SAI_ROUTER_INTERFACE_ATTR_PORT_ID",
        }),
        RouterInterfaceType::Vlan if vlan.is_none() => Err(SaiError::MandatoryAttributeMissing {
            attribute: "SAI_ROUTER_INTERFACE_ATTR_VLAN_ID",
        }),
        _ => Ok(RifRequest {
            rif_type,
            vrf,
            port,
            vlan,
            mac,
        }),
    }
}

/// Moves `port` from the default VLAN onto a fresh VLAN of its own.
fn borrow_vlan<S: SwitchSdk>(sdk: &S, ctx: &mut SwitchContext, port: u32) -> SaiResult<u16> {
    let vlan = ctx
        .vlans
        .max_unused()
        .ok_or_else(|| SaiError::table_full("vlan"))?;
    let default_vlan = ctx.default_vlan;

    sdk.vlan_create(vlan).map_err(SaiError::sdk("vlan_create"))?;
    let steps = sdk
        .vlan_port_add(vlan, &[port], &[port])
        .map_err(SaiError::sdk("vlan_port_add"))
        .and_then(|_| {
            sdk.port_untagged_vlan_set(port, vlan)
                .map_err(SaiError::sdk("port_untagged_vlan_set"))
        })
        .and_then(|_| {
            sdk.vlan_port_remove(default_vlan, &[port])
                .map_err(SaiError::sdk("vlan_port_remove"))
        });
    if let Err(e) = steps {
        if let Err(undo) = sdk.port_untagged_vlan_set(port, default_vlan) {
            warn_log!(SaiApi::RouterInterface, port, vlan = default_vlan, error = %undo, "untagged VLAN rollback failed");
        }
        if let Err(undo) = sdk.vlan_destroy(vlan) {
            warn_log!(SaiApi::RouterInterface, vlan, error = %undo, "VLAN rollback failed");
        }
        return Err(e);
    }

    ctx.vlans.set(vlan);
    debug_log!(SaiApi::RouterInterface, port, vlan, "borrowed VLAN for port interface");
    Ok(vlan)
}

/// Puts `port` back on the default VLAN and destroys the borrowed one.
/// Safe to repeat after a partial failure.
fn return_vlan<S: SwitchSdk>(sdk: &S, ctx: &mut SwitchContext, port: u32, vlan: u16) -> SaiResult<()> {
    let default_vlan = ctx.default_vlan;
    sdk.vlan_port_add(default_vlan, &[port], &[port])
        .map_err(SaiError::sdk("vlan_port_add"))?;
    sdk.port_untagged_vlan_set(port, default_vlan)
        .map_err(SaiError::sdk("port_untagged_vlan_set"))?;
    match sdk.vlan_destroy(vlan) {
        Ok(()) | Err(SdkError::NotFound) => {}
        Err(e) => return Err(SaiError::sdk("vlan_destroy")(e)),
    }
    ctx.vlans.clear(vlan);
    Ok(())
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_router_interface(
        &mut self,
        attrs: &[Attribute<RouterInterfaceAttr>],
    ) -> SaiResult<Handle> {
        let (sdk, ctx) = self.parts_mut()?;
        let request = parse_request(ctx, attrs).map_err(|e| {
            warn_log!(SaiApi::RouterInterface, error = %e, "rejected router interface");
            e
        })?;
        let mac = match request.mac {
            Some(mac) => mac,
            None => ctx.check_vrf(request.vrf)?.mac,
        };

        let (vlan, borrowed) = match (request.port, request.vlan) {
            (Some(port), _) => (borrow_vlan(sdk, ctx, port)?, Some(port)),
            (None, Some(vlan)) => (vlan, None),
            (None, None) => return Err(SaiError::internal("router interface without port or VLAN")),
        };
        let undo_vlan = |ctx: &mut SwitchContext| {
            if let Some(port) = borrowed {
                if let Err(e) = return_vlan(sdk, ctx, port, vlan) {
                    warn_log!(SaiApi::RouterInterface, port, vlan, error = %e, "returning borrowed VLAN failed");
                }
            }
        };

        let intf_id = match sdk.l3_intf_create(&L3Intf {
            mac,
            vlan,
            vrf: request.vrf,
            ttl: L3_INTF_TTL,
        }) {
            Ok(id) => id,
            Err(e) => {
                error_log!(SaiApi::RouterInterface, vlan, error = %e, "L3 interface create failed");
                undo_vlan(ctx);
                return Err(SaiError::sdk("l3_intf_create")(e));
            }
        };

        let undo_intf = || {
            if let Err(e) = sdk.l3_intf_delete(intf_id) {
                warn_log!(SaiApi::RouterInterface, intf_id, error = %e, "L3 interface rollback failed");
            }
        };

        let mut record = RouterInterfaceRecord {
            rif_type: request.rif_type,
            port: request.port,
            vlan,
            mac,
            vrf: request.vrf,
            station_id: 0,
            detached: false,
        };
        record.station_id = match sdk.l2_station_add(&record.station()) {
            Ok(id) => id,
            Err(e) => {
                error_log!(SaiApi::RouterInterface, intf_id, error = %e, "L2 station add failed");
                undo_intf();
                undo_vlan(ctx);
                return Err(SaiError::sdk("l2_station_add")(e));
            }
        };

        let station_id = record.station_id;
        if let Err(e) = ctx.router_interfaces.insert_at(intf_id, record) {
            if let Err(undo) = sdk.l2_station_delete(station_id) {
                warn_log!(SaiApi::RouterInterface, station_id, error = %undo, "L2 station rollback failed");
            }
            undo_intf();
            undo_vlan(ctx);
            return Err(e);
        }

        info_log!(SaiApi::RouterInterface, intf_id, vlan, vrf = request.vrf, mac = %mac, "router interface created");
        Ok(Handle::encode(ObjectType::RouterInterface, intf_id))
    }

    pub fn remove_router_interface(&mut self, rif_id: Handle) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let intf_id = expect_type(rif_id, ObjectType::RouterInterface)?;
        let record = ctx.router_interfaces.get(intf_id)?.clone();
        let referenced = ctx.next_hops.values().any(|hop| hop.rif == intf_id)
            || ctx.neighbors.keys().any(|(rif, _)| *rif == intf_id);
        if referenced {
            return Err(SaiError::object_in_use(format!("router interface {}", intf_id)));
        }

        // The slot is released last so a failed step can be retried.
        if !record.detached {
            match sdk.l2_station_delete(record.station_id) {
                Ok(()) | Err(SdkError::NotFound) => {}
                Err(e) => return Err(SaiError::sdk("l2_station_delete")(e)),
            }
            if let Err(e) = sdk.l3_intf_delete(intf_id) {
                error_log!(SaiApi::RouterInterface, intf_id, error = %e, "L3 interface delete failed");
                match sdk.l2_station_add(&record.station()) {
                    Ok(id) => ctx.router_interfaces.get_mut(intf_id)?.station_id = id,
                    Err(undo) => {
                        warn_log!(SaiApi::RouterInterface, intf_id, error = %undo, "L2 station restore failed");
                    }
                }
                return Err(SaiError::sdk("l3_intf_delete")(e));
            }
            ctx.router_interfaces.get_mut(intf_id)?.detached = true;
        }

        if let Some(port) = record.port {
            return_vlan(sdk, ctx, port, record.vlan).map_err(|e| {
                error_log!(SaiApi::RouterInterface, intf_id, port, vlan = record.vlan, error = %e, "returning borrowed VLAN failed");
                e
            })?;
        }
        ctx.router_interfaces.release(intf_id);
        info_log!(SaiApi::RouterInterface, intf_id, "router interface removed");
        Ok(())
    }

    pub fn set_router_interface_attribute(
        &mut self,
        _rif_id: Handle,
        attr: &Attribute<RouterInterfaceAttr>,
    ) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("router interface set {:?}", attr.id)))
    }

    pub fn get_router_interface_attribute(
        &self,
        rif_id: Handle,
        attrs: &mut [Attribute<RouterInterfaceAttr>],
    ) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let intf_id = expect_type(rif_id, ObjectType::RouterInterface)?;
        let record = ctx.router_interfaces.get(intf_id)?;

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                RouterInterfaceAttr::Type => AttributeValue::S32(record.rif_type as i32),
                RouterInterfaceAttr::VirtualRouterId => {
                    AttributeValue::Oid(Handle::encode(ObjectType::VirtualRouter, record.vrf))
                }
                RouterInterfaceAttr::PortId => AttributeValue::Oid(
                    record
                        .port
                        .map_or(Handle::NULL, |p| Handle::encode(ObjectType::Port, p)),
                ),
                RouterInterfaceAttr::VlanId => AttributeValue::U16(record.vlan),
                RouterInterfaceAttr::SrcMacAddress => AttributeValue::Mac(record.mac),
                other => {
                    return Err(SaiError::not_supported(format!("router interface get {:?}", other)));
                }
            };
        }
        Ok(())
    }
}
