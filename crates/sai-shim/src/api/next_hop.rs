//! Next hops.
//!
//! An IP next hop is a forwarding egress toward a resolved neighbor. The
//! egress id is the handle value, so routes and next-hop groups hand it to
//! the SDK unchanged.

use std::net::IpAddr;

use crate::attr::{attr_ids, check_get_list, find, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{EgressKind, L3Egress, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch};

attr_ids! {
    pub enum NextHopAttr {
        Type => "SAI_NEXT_HOP_ATTR_TYPE",
        Ip => "SAI_NEXT_HOP_ATTR_IP",
        RouterInterfaceId => "SAI_NEXT_HOP_ATTR_ROUTER_INTERFACE_ID",
    }
}

/// `SAI_NEXT_HOP_TYPE_IP`.
pub const NEXT_HOP_TYPE_IP: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHopRecord {
    pub ip: IpAddr,
    /// SDK interface id of the router interface.
    pub rif: u32,
}

impl<S: SwitchSdk> SaiSwitch<S> {
    /// The neighbor for (`ROUTER_INTERFACE_ID`, `IP`) must already exist.
    pub fn create_next_hop(&mut self, attrs: &[Attribute<NextHopAttr>]) -> SaiResult<Handle> {
        let (sdk, ctx) = self.parts_mut()?;

        let hop_type = find(attrs, NextHopAttr::Type)
            .ok_or(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_NEXT_HOP_ATTR_TYPE",
            })?
            .as_s32()?;
        if hop_type != NEXT_HOP_TYPE_IP {
            return Err(SaiError::not_supported(format!("next hop type {}", hop_type)));
        }
        let ip = match find(attrs, NextHopAttr::Ip).map(|a| &a.value) {
            Some(AttributeValue::Ip(ip)) => *ip,
            Some(other) => {
                return Err(SaiError::invalid_parameter(format!("next hop IP is not an address: {:?}", other)))
            }
            None => {
                return Err(SaiError::MandatoryAttributeMissing {
                    attribute: "SAI_NEXT_HOP_ATTR_IP",
                })
            }
        };
        let rif_handle = find(attrs, NextHopAttr::RouterInterfaceId)
            .ok_or(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_NEXT_HOP_ATTR_ROUTER_INTERFACE_ID",
            })?
            .as_oid()?;
        let rif = expect_type(rif_handle, ObjectType::RouterInterface)
            .map_err(|_| SaiError::invalid_parameter(format!("not a router interface: {:?}", rif_handle)))?;
        let record = ctx
            .router_interfaces
            .get(rif)
            .map_err(|_| SaiError::invalid_parameter(format!("router interface {} does not exist", rif)))?;
        let neighbor = ctx
            .neighbors
            .get(&(rif, ip))
            .ok_or_else(|| SaiError::not_found(format!("neighbor {} on rif {}", ip, rif)))?;

        let port = match record.port {
            Some(port) => port,
            None => {
                let l2 = sdk.l2_addr_get(neighbor.mac, record.vlan).map_err(|e| {
                    warn_log!(SaiApi::NextHop, rif, mac = %neighbor.mac, vlan = record.vlan, error = %e, "neighbor MAC not learned");
                    SaiError::sdk("l2_addr_get")(e)
                })?;
                l2.port
            }
        };

        let egress = sdk
            .l3_egress_create(&L3Egress {
                intf: rif,
                src_mac: record.mac,
                kind: EgressKind::Forward {
                    port,
                    dst_mac: neighbor.mac,
                },
            })
            .map_err(|e| {
                error_log!(SaiApi::NextHop, rif, ip = %ip, error = %e, "egress create failed");
                SaiError::sdk("l3_egress_create")(e)
            })?;
        ctx.next_hops.insert(egress, NextHopRecord { ip, rif });
        info_log!(SaiApi::NextHop, egress, rif, ip = %ip, port, "next hop created");
        Ok(Handle::encode(ObjectType::NextHop, egress))
    }

    pub fn remove_next_hop(&mut self, next_hop_id: Handle) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let egress = expect_type(next_hop_id, ObjectType::NextHop)?;
        if !ctx.next_hops.contains_key(&egress) {
            return Err(SaiError::not_found(format!("next hop {}", egress)));
        }
        sdk.l3_egress_destroy(egress)
            .map_err(SaiError::sdk("l3_egress_destroy"))?;
        ctx.next_hops.remove(&egress);
        info_log!(SaiApi::NextHop, egress, "next hop removed");
        Ok(())
    }

    pub fn set_next_hop_attribute(&mut self, _next_hop_id: Handle, attr: &Attribute<NextHopAttr>) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("next hop set {:?}", attr.id)))
    }

    pub fn get_next_hop_attribute(&self, next_hop_id: Handle, attrs: &mut [Attribute<NextHopAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let egress = expect_type(next_hop_id, ObjectType::NextHop)?;
        let record = ctx
            .next_hops
            .get(&egress)
            .ok_or_else(|| SaiError::not_found(format!("next hop {}", egress)))?;
        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                NextHopAttr::Type => AttributeValue::S32(NEXT_HOP_TYPE_IP),
                NextHopAttr::Ip => AttributeValue::Ip(record.ip),
                NextHopAttr::RouterInterfaceId => {
                    AttributeValue::Oid(Handle::encode(ObjectType::RouterInterface, record.rif))
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::neighbor::tests::{mac_attr, neighbor_mac};
    use crate::api::neighbor::NeighborEntry;
    use crate::api::router_interface::tests::port_rif;
    use crate::api::test_support::switch;
    use crate::error::SaiStatus;
    use crate::sdk::sim::SimulatedSdk;
    use crate::sdk::{L2Action, L2Addr, SdkError};
    use pretty_assertions::assert_eq;

    pub(crate) fn hop_attrs(rif: Handle, ip: IpAddr) -> Vec<Attribute<NextHopAttr>> {
        vec![
            Attribute::new(NextHopAttr::Type, AttributeValue::S32(NEXT_HOP_TYPE_IP)),
            Attribute::new(NextHopAttr::Ip, AttributeValue::Ip(ip)),
            Attribute::new(NextHopAttr::RouterInterfaceId, AttributeValue::Oid(rif)),
        ]
    }

    /// Next hop on `rif` toward a neighbor at `ip` with MAC `04:..:last`.
    pub(crate) fn resolved_next_hop(sw: &mut SaiSwitch<SimulatedSdk>, rif: Handle, ip: &str, last: u8) -> Handle {
        let ip: IpAddr = ip.parse().unwrap();
        sw.create_neighbor_entry(
            &NeighborEntry {
                rif_id: rif,
                ip_address: ip,
            },
            &[mac_attr(neighbor_mac(last))],
        )
        .unwrap();
        sw.create_next_hop(&hop_attrs(rif, ip)).unwrap()
    }

    #[test]
    fn test_port_next_hop() {
        let mut sw = switch();
        let rif = port_rif(&mut sw, 3);
        let hop = resolved_next_hop(&mut sw, rif, "10.0.0.2", 2);

        let egress = sw.sdk().egress(hop.index()).unwrap();
        assert_eq!(egress.intf, rif.index());
        assert_eq!(
            egress.kind,
            EgressKind::Forward {
                port: 3,
                dst_mac: neighbor_mac(2)
            }
        );

        let mut attrs = vec![
            Attribute::query(NextHopAttr::Type),
            Attribute::query(NextHopAttr::Ip),
            Attribute::query(NextHopAttr::RouterInterfaceId),
        ];
        sw.get_next_hop_attribute(hop, &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::S32(NEXT_HOP_TYPE_IP));
        assert_eq!(attrs[1].value, AttributeValue::Ip("10.0.0.2".parse().unwrap()));
        assert_eq!(attrs[2].value, AttributeValue::Oid(rif));

        sw.remove_next_hop(hop).unwrap();
        assert_eq!(sw.sdk().egress(hop.index()), None);
        assert_eq!(sw.remove_next_hop(hop).unwrap_err().status(), SaiStatus::ItemNotFound);
    }

    #[test]
    fn test_vlan_next_hop_uses_fdb_port() {
        use crate::api::router_interface::{RouterInterfaceAttr, RouterInterfaceType};
        use crate::api::virtual_router::VirtualRouterAttr;

        let mut sw = switch();
        sw.create_vlan(100).unwrap();
        let vr = sw
            .create_virtual_router(&[Attribute::new(
                VirtualRouterAttr::SrcMacAddress,
                AttributeValue::Mac(neighbor_mac(1)),
            )])
            .unwrap();
        let rif = sw
            .create_router_interface(&[
                Attribute::new(
                    RouterInterfaceAttr::Type,
                    AttributeValue::S32(RouterInterfaceType::Vlan as i32),
                ),
                Attribute::new(RouterInterfaceAttr::VirtualRouterId, AttributeValue::Oid(vr)),
                Attribute::new(RouterInterfaceAttr::VlanId, AttributeValue::U16(100)),
            ])
            .unwrap();
        let ip: IpAddr = "192.168.1.5".parse().unwrap();
        sw.create_neighbor_entry(
            &NeighborEntry {
                rif_id: rif,
                ip_address: ip,
            },
            &[mac_attr(neighbor_mac(5))],
        )
        .unwrap();

        // Not learned yet.
        assert_eq!(
            sw.create_next_hop(&hop_attrs(rif, ip)).unwrap_err().status(),
            SaiStatus::ItemNotFound
        );

        sw.sdk()
            .l2_addr_add(&L2Addr {
                mac: neighbor_mac(5),
                vlan: 100,
                port: 6,
                is_static: false,
                action: L2Action::Forward,
                replace: false,
            })
            .unwrap();
        let hop = sw.create_next_hop(&hop_attrs(rif, ip)).unwrap();
        assert_eq!(
            sw.sdk().egress(hop.index()).unwrap().kind,
            EgressKind::Forward {
                port: 6,
                dst_mac: neighbor_mac(5)
            }
        );
    }

    #[test]
    fn test_create_validation() {
        let mut sw = switch();
        let rif = port_rif(&mut sw, 1);
        let ip: IpAddr = "10.0.0.9".parse().unwrap();

        assert_eq!(
            sw.create_next_hop(&hop_attrs(rif, ip)[1..]).unwrap_err().status(),
            SaiStatus::MandatoryAttributeMissing
        );
        let mut tunnel = hop_attrs(rif, ip);
        tunnel[0] = Attribute::new(NextHopAttr::Type, AttributeValue::S32(1));
        assert_eq!(sw.create_next_hop(&tunnel).unwrap_err().status(), SaiStatus::NotSupported);

        // No neighbor for the address.
        assert_eq!(
            sw.create_next_hop(&hop_attrs(rif, ip)).unwrap_err().status(),
            SaiStatus::ItemNotFound
        );
        let missing_rif = Handle::encode(ObjectType::RouterInterface, 40);
        assert_eq!(
            sw.create_next_hop(&hop_attrs(missing_rif, ip)).unwrap_err().status(),
            SaiStatus::InvalidParameter
        );
        assert!(sw.context().unwrap().next_hops.is_empty());
    }

    #[test]
    fn test_references_block_removal() {
        let mut sw = switch();
        let rif = port_rif(&mut sw, 2);
        let hop = resolved_next_hop(&mut sw, rif, "10.0.0.2", 2);
        let neigh = NeighborEntry {
            rif_id: rif,
            ip_address: "10.0.0.2".parse().unwrap(),
        };

        assert_eq!(sw.remove_neighbor_entry(&neigh).unwrap_err().status(), SaiStatus::ObjectInUse);
        assert_eq!(sw.remove_all_neighbor_entries().unwrap_err().status(), SaiStatus::ObjectInUse);
        assert_eq!(sw.remove_router_interface(rif).unwrap_err().status(), SaiStatus::ObjectInUse);

        sw.remove_next_hop(hop).unwrap();
        sw.remove_neighbor_entry(&neigh).unwrap();
        sw.remove_router_interface(rif).unwrap();
    }

    #[test]
    fn test_failed_egress_leaves_no_record() {
        let mut sw = switch();
        let rif = port_rif(&mut sw, 1);
        sw.sdk().fail_next("l3_egress_create", SdkError::Full);
        let ip: IpAddr = "10.0.0.2".parse().unwrap();
        sw.create_neighbor_entry(
            &NeighborEntry {
                rif_id: rif,
                ip_address: ip,
            },
            &[mac_attr(neighbor_mac(2))],
        )
        .unwrap();
        assert_eq!(sw.create_next_hop(&hop_attrs(rif, ip)).unwrap_err().status(), SaiStatus::TableFull);
        assert!(sw.context().unwrap().next_hops.is_empty());
    }
}
