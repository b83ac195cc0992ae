//! Virtual routers.
//!
//! Each virtual router is a VRF id plus three SDK objects created with it:
//! an L3 interface carrying the router MAC, and two egress objects routes
//! point at for drop and trap actions.

use sai_types::MacAddress;

use crate::attr::{attr_ids, check_get_list, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{EgressKind, L3Egress, L3Intf, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch};

/// TTL threshold programmed on router interfaces.
pub(crate) const L3_INTF_TTL: u8 = 64;

attr_ids! {
    pub enum VirtualRouterAttr {
        AdminV4State => "SAI_VIRTUAL_ROUTER_ATTR_ADMIN_V4_STATE",
        AdminV6State => "SAI_VIRTUAL_ROUTER_ATTR_ADMIN_V6_STATE",
        SrcMacAddress => "SAI_VIRTUAL_ROUTER_ATTR_SRC_MAC_ADDRESS",
        ViolationTtl1Action => "SAI_VIRTUAL_ROUTER_ATTR_VIOLATION_TTL1_ACTION",
        ViolationIpOptions => "SAI_VIRTUAL_ROUTER_ATTR_VIOLATION_IP_OPTIONS",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualRouterRecord {
    /// SDK interface holding the router MAC.
    pub l3_intf: u32,
    /// Egress that discards; target of `PACKET_ACTION_DROP` routes.
    pub drop_egress: u32,
    /// Egress that punts to the CPU; target of `PACKET_ACTION_TRAP` routes.
    pub trap_egress: u32,
    pub mac: MacAddress,
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_virtual_router(&mut self, attrs: &[Attribute<VirtualRouterAttr>]) -> SaiResult<Handle> {
        let (sdk, ctx) = self.parts_mut()?;

        if ctx.virtual_routers.is_full() {
            warn_log!(SaiApi::VirtualRouter, max = ctx.virtual_routers.max(), "no free VRF");
            return Err(SaiError::ResourceExhausted {
                table: ctx.virtual_routers.name(),
            });
        }

        let mut mac = ctx.system_mac;
        for attr in attrs {
            match attr.id {
                VirtualRouterAttr::SrcMacAddress => mac = attr.as_mac()?,
                other => {
                    debug_log!(SaiApi::VirtualRouter, attr = ?other, "ignoring virtual router attribute");
                }
            }
        }

        let vrf = ctx.virtual_routers.next_free()?;
        let l3_intf = sdk
            .l3_intf_create(&L3Intf {
                mac,
                vlan: ctx.default_vlan,
                vrf,
                ttl: L3_INTF_TTL,
            })
            .map_err(|e| {
                error_log!(SaiApi::VirtualRouter, vrf, error = %e, "L3 interface create failed");
                SaiError::sdk("l3_intf_create")(e)
            })?;

        let undo_intf = || {
            if let Err(e) = sdk.l3_intf_delete(l3_intf) {
                warn_log!(SaiApi::VirtualRouter, vrf, l3_intf, error = %e, "L3 interface rollback failed");
            }
        };
        let egress = |kind| L3Egress {
            intf: l3_intf,
            src_mac: mac,
            kind,
        };
        let drop_egress = match sdk.l3_egress_create(&egress(EgressKind::Discard)) {
            Ok(id) => id,
            Err(e) => {
                undo_intf();
                error_log!(SaiApi::VirtualRouter, vrf, error = %e, "drop egress create failed");
                return Err(SaiError::sdk("l3_egress_create")(e));
            }
        };
        let trap_egress = match sdk.l3_egress_create(&egress(EgressKind::CopyToCpu)) {
            Ok(id) => id,
            Err(e) => {
                if let Err(undo) = sdk.l3_egress_destroy(drop_egress) {
                    warn_log!(SaiApi::VirtualRouter, vrf, drop_egress, error = %undo, "drop egress rollback failed");
                }
                undo_intf();
                error_log!(SaiApi::VirtualRouter, vrf, error = %e, "trap egress create failed");
                return Err(SaiError::sdk("l3_egress_create")(e));
            }
        };

        ctx.virtual_routers.insert_at(
            vrf,
            VirtualRouterRecord {
                l3_intf,
                drop_egress,
                trap_egress,
                mac,
            },
        )?;
        info_log!(SaiApi::VirtualRouter, vrf, mac = %mac, l3_intf, "virtual router created");
        Ok(Handle::encode(ObjectType::VirtualRouter, vrf))
    }

    /// Fails with `ObjectInUse` while router interfaces still reference it.
    pub fn remove_virtual_router(&mut self, vr_id: Handle) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let vrf = expect_type(vr_id, ObjectType::VirtualRouter)?;
        if vrf > ctx.virtual_routers.max() {
            return Err(SaiError::invalid_parameter(format!(
                "virtual router {} out of range",
                vrf
            )));
        }
        let record = ctx.virtual_routers.get(vrf)?.clone();
        if ctx.router_interfaces.iter().any(|(_, rif)| rif.vrf == vrf) {
            return Err(SaiError::object_in_use(format!("virtual router {}", vrf)));
        }

        sdk.l3_egress_destroy(record.trap_egress)
            .map_err(SaiError::sdk("l3_egress_destroy"))?;
        sdk.l3_egress_destroy(record.drop_egress)
            .map_err(SaiError::sdk("l3_egress_destroy"))?;
        sdk.l3_intf_delete(record.l3_intf)
            .map_err(SaiError::sdk("l3_intf_delete"))?;

        ctx.virtual_routers.release(vrf);
        info_log!(SaiApi::VirtualRouter, vrf, "virtual router removed");
        Ok(())
    }

    pub fn set_virtual_router_attribute(
        &mut self,
        _vr_id: Handle,
        attr: &Attribute<VirtualRouterAttr>,
    ) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("virtual router set {:?}", attr.id)))
    }

    pub fn get_virtual_router_attribute(
        &self,
        vr_id: Handle,
        attrs: &mut [Attribute<VirtualRouterAttr>],
    ) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let vrf = expect_type(vr_id, ObjectType::VirtualRouter)?;
        let record = ctx.check_vrf(vrf)?;
        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                VirtualRouterAttr::SrcMacAddress => AttributeValue::Mac(record.mac),
                other => {
                    return Err(SaiError::not_implemented(format!("virtual router get {:?}", other)));
                }
            };
        }
        Ok(())
    }
}
