//! Routes.
//!
//! Route entries are keyed by virtual router and destination prefix and are
//! programmed straight into the SDK's L3 table. Trap and drop routes point
//! at the egress objects created with their virtual router.

use sai_types::IpPrefix;

use crate::attr::{attr_ids, Attribute};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{L3Route, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch, SwitchContext};

use super::virtual_router::VirtualRouterRecord;
use super::PacketAction;

/// `sai_unicast_route_entry_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub vr_id: Handle,
    pub destination: IpPrefix,
}

attr_ids! {
    pub enum RouteAttr {
        PacketAction => "SAI_ROUTE_ATTR_PACKET_ACTION",
        TrapPriority => "SAI_ROUTE_ATTR_TRAP_PRIORITY",
        NextHopId => "SAI_ROUTE_ATTR_NEXT_HOP_ID",
    }
}

fn route_vrf<'a>(ctx: &'a SwitchContext, entry: &RouteEntry) -> SaiResult<(u32, &'a VirtualRouterRecord)> {
    let vrf = expect_type(entry.vr_id, ObjectType::VirtualRouter)
        .map_err(|_| SaiError::invalid_parameter(format!("not a virtual router: {:?}", entry.vr_id)))?;
    Ok((vrf, ctx.check_vrf(vrf)?))
}

/// Resolves the attributes of a new route into its SDK form.
fn build_route(vrf: u32, record: &VirtualRouterRecord, destination: &IpPrefix, attrs: &[Attribute<RouteAttr>]) -> SaiResult<L3Route> {
    let mut next_hop = None;
    let mut action = PacketAction::Forward;
    for attr in attrs {
        match attr.id {
            RouteAttr::NextHopId => {
                let handle = attr.as_oid()?;
                next_hop = match handle.decode_type() {
                    ObjectType::NextHop => Some((handle.index(), false)),
                    ObjectType::NextHopGroup => Some((handle.index(), true)),
                    _ => {
                        return Err(SaiError::invalid_parameter(format!(
                            "route next hop {:?}",
                            handle
                        )))
                    }
                };
            }
            RouteAttr::PacketAction => {
                let raw = attr.as_s32()?;
                action = PacketAction::from_s32(raw)
                    .ok_or_else(|| SaiError::invalid_parameter(format!("packet action {}", raw)))?;
            }
            RouteAttr::TrapPriority => {
                debug_log!(SaiApi::Route, "ignoring route trap priority");
            }
        }
    }

    let mut copy_to_cpu = false;
    let (egress, multipath) = match action {
        PacketAction::Forward => next_hop.ok_or_else(|| {
            SaiError::invalid_parameter(format!("route {} has no next hop", destination))
        })?,
        PacketAction::Log => {
            copy_to_cpu = true;
            next_hop.ok_or_else(|| {
                SaiError::invalid_parameter(format!("route {} has no next hop", destination))
            })?
        }
        PacketAction::Trap => (record.trap_egress, false),
        PacketAction::Drop => (record.drop_egress, false),
        other => {
            return Err(SaiError::invalid_parameter(format!(
                "route packet action {:?}",
                other
            )))
        }
    };

    Ok(L3Route {
        vrf,
        subnet: destination.network(),
        mask: destination.mask(),
        egress,
        multipath,
        copy_to_cpu,
    })
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_route(&mut self, entry: &RouteEntry, attrs: &[Attribute<RouteAttr>]) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let (vrf, record) = route_vrf(ctx, entry)?;
        let route = build_route(vrf, record, &entry.destination, attrs).map_err(|e| {
            warn_log!(SaiApi::Route, prefix = %entry.destination, error = %e, "rejected route");
            e
        })?;

        sdk.l3_route_add(&route).map_err(|e| {
            error_log!(SaiApi::Route, prefix = %entry.destination, vrf, error = %e, "route add failed");
            SaiError::sdk("l3_route_add")(e)
        })?;
        debug_log!(SaiApi::Route, prefix = %entry.destination, vrf, egress = route.egress, multipath = route.multipath, "route created");
        Ok(())
    }

    pub fn remove_route(&mut self, entry: &RouteEntry) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let (vrf, _) = route_vrf(ctx, entry)?;
        let route = L3Route {
            vrf,
            subnet: entry.destination.network(),
            mask: entry.destination.mask(),
            egress: 0,
            multipath: false,
            copy_to_cpu: false,
        };
        sdk.l3_route_delete(&route)
            .map_err(SaiError::sdk("l3_route_delete"))?;
        debug_log!(SaiApi::Route, prefix = %entry.destination, vrf, "route removed");
        Ok(())
    }

    pub fn set_route_attribute(&mut self, _entry: &RouteEntry, attr: &Attribute<RouteAttr>) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("route set {:?}", attr.id)))
    }

    pub fn get_route_attribute(&self, _entry: &RouteEntry, _attrs: &mut [Attribute<RouteAttr>]) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented("route get"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::next_hop_group::tests::next_hops;
    use crate::api::next_hop_group::{NextHopGroupAttr, NEXT_HOP_GROUP_TYPE_ECMP};
    use crate::api::test_support::switch;
    use crate::attr::AttributeValue;
    use crate::error::SaiStatus;
    use crate::sdk::sim::SimulatedSdk;
    use pretty_assertions::assert_eq;
    use std::net::IpAddr;

    fn setup() -> (SaiSwitch<SimulatedSdk>, Handle, VirtualRouterRecord) {
        let mut sw = switch();
        let vr = sw.create_virtual_router(&[]).unwrap();
        let record = sw.context().unwrap().virtual_routers.get(vr.index()).unwrap().clone();
        (sw, vr, record)
    }

    fn entry(vr: Handle, prefix: &str) -> RouteEntry {
        RouteEntry {
            vr_id: vr,
            destination: prefix.parse().unwrap(),
        }
    }

    fn action(a: PacketAction) -> Attribute<RouteAttr> {
        Attribute::new(RouteAttr::PacketAction, AttributeValue::S32(a as i32))
    }

    fn next_hop(h: Handle) -> Attribute<RouteAttr> {
        Attribute::new(RouteAttr::NextHopId, AttributeValue::Oid(h))
    }

    #[test]
    fn test_forward_via_next_hop() {
        let (mut sw, vr, _) = setup();
        let hop = next_hops(&mut sw, 1)[0];
        sw.create_route(&entry(vr, "10.1.0.0/16"), &[next_hop(hop)]).unwrap();

        let routes = sw.sdk().routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].subnet, "10.1.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(routes[0].mask, "255.255.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(routes[0].egress, hop.index());
        assert!(!routes[0].multipath);
        assert_eq!(routes[0].vrf, vr.index());
    }

    #[test]
    fn test_group_next_hop_is_multipath() {
        let (mut sw, vr, _) = setup();
        let hops = next_hops(&mut sw, 2);
        let group = sw
            .create_next_hop_group(&[
                Attribute::new(NextHopGroupAttr::Type, AttributeValue::S32(NEXT_HOP_GROUP_TYPE_ECMP)),
                Attribute::new(NextHopGroupAttr::NextHopList, AttributeValue::OidList(hops)),
            ])
            .unwrap();
        sw.create_route(&entry(vr, "2001:db8::/32"), &[next_hop(group), action(PacketAction::Log)])
            .unwrap();

        let route = sw.sdk().routes().remove(0);
        assert!(route.multipath);
        assert!(route.copy_to_cpu);
        assert_eq!(route.egress, group.index());
        assert_eq!(route.mask, "ffff:ffff::".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trap_and_drop_use_vr_egress() {
        let (mut sw, vr, record) = setup();
        sw.create_route(&entry(vr, "192.168.0.0/24"), &[action(PacketAction::Trap)]).unwrap();
        sw.create_route(&entry(vr, "192.168.1.0/24"), &[action(PacketAction::Drop)]).unwrap();

        let routes = sw.sdk().routes();
        assert_eq!(routes[0].egress, record.trap_egress);
        assert_eq!(routes[1].egress, record.drop_egress);
    }

    #[test]
    fn test_rejections() {
        let (mut sw, vr, _) = setup();
        let cases: Vec<(RouteEntry, Vec<Attribute<RouteAttr>>)> = vec![
            (entry(vr, "10.0.0.0/8"), vec![]),
            (entry(vr, "10.0.0.0/8"), vec![action(PacketAction::Log)]),
            (entry(vr, "10.0.0.0/8"), vec![action(PacketAction::Deny)]),
            (entry(Handle::encode(ObjectType::VirtualRouter, 12), "10.0.0.0/8"), vec![action(PacketAction::Trap)]),
            (entry(Handle::encode(ObjectType::Port, 1), "10.0.0.0/8"), vec![action(PacketAction::Trap)]),
        ];
        for (route, attrs) in cases {
            assert_eq!(
                sw.create_route(&route, &attrs).unwrap_err().status(),
                SaiStatus::InvalidParameter,
                "{:?}",
                attrs
            );
        }
        assert!(sw.sdk().routes().is_empty());
    }

    #[test]
    fn test_remove() {
        let (mut sw, vr, _) = setup();
        let e = entry(vr, "172.16.0.0/12");
        sw.create_route(&e, &[action(PacketAction::Drop)]).unwrap();
        assert_eq!(
            sw.create_route(&e, &[action(PacketAction::Drop)]).unwrap_err().status(),
            SaiStatus::ItemAlreadyExists
        );
        sw.remove_route(&e).unwrap();
        assert!(sw.sdk().routes().is_empty());
        assert_eq!(sw.remove_route(&e).unwrap_err().status(), SaiStatus::ItemNotFound);
        assert_eq!(
            sw.get_route_attribute(&e, &mut [Attribute::query(RouteAttr::PacketAction)])
                .unwrap_err()
                .status(),
            SaiStatus::NotImplemented
        );
    }
}
