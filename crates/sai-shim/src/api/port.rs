//! Port API.
//!
//! Ports are created by the SDK at bring-up; the shim never allocates them.
//! A port handle's value is the SDK port number.

use sai_types::VlanId;

use crate::attr::{attr_ids, check_get_list, AttrId, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType, QueueType};
use crate::logging::SaiApi;
use crate::notify::PortOperStatus;
use crate::sdk::{PortCounter, SwitchSdk};
use crate::switch::SaiSwitch;

use super::buffer::{ingress_priority_group_handle, INGRESS_PRIORITY_GROUPS_PER_PORT};
use super::queue::queue_handle;
use super::scheduler::{bind_scheduler, SchedulerTarget};

attr_ids! {
    pub enum PortAttr {
        OperStatus => "SAI_PORT_ATTR_OPER_STATUS",
        Speed => "SAI_PORT_ATTR_SPEED",
        AdminState => "SAI_PORT_ATTR_ADMIN_STATE",
        PortVlanId => "SAI_PORT_ATTR_PORT_VLAN_ID",
        QosSchedulerProfileId => "SAI_PORT_ATTR_QOS_SCHEDULER_PROFILE_ID",
        QosNumberOfQueues => "SAI_PORT_ATTR_QOS_NUMBER_OF_QUEUES",
        QosQueueList => "SAI_PORT_ATTR_QOS_QUEUE_LIST",
        NumberOfIngressPriorityGroups => "SAI_PORT_ATTR_NUMBER_OF_INGRESS_PRIORITY_GROUPS",
        IngressPriorityGroupList => "SAI_PORT_ATTR_INGRESS_PRIORITY_GROUP_LIST",
    }
}

/// `sai_port_stat_counter_t` subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStat {
    IfInOctets,
    IfInUcastPkts,
    IfInNonUcastPkts,
    IfInDiscards,
    IfInErrors,
    IfOutOctets,
    IfOutUcastPkts,
    IfOutNonUcastPkts,
    IfOutDiscards,
    IfOutErrors,
    IpInOctets,
    IpOutOctets,
    Ipv6InOctets,
    Ipv6OutOctets,
}

impl PortStat {
    /// SDK counter backing this statistic. IP-level octet counts have none.
    fn counter(self) -> Option<PortCounter> {
        let counter = match self {
            PortStat::IfInOctets => PortCounter::InOctets,
            PortStat::IfInUcastPkts => PortCounter::InUnicastPackets,
            PortStat::IfInNonUcastPkts => PortCounter::InNonUnicastPackets,
            PortStat::IfInDiscards => PortCounter::InDiscards,
            PortStat::IfInErrors => PortCounter::InErrors,
            PortStat::IfOutOctets => PortCounter::OutOctets,
            PortStat::IfOutUcastPkts => PortCounter::OutUnicastPackets,
            PortStat::IfOutNonUcastPkts => PortCounter::OutNonUnicastPackets,
            PortStat::IfOutDiscards => PortCounter::OutDiscards,
            PortStat::IfOutErrors => PortCounter::OutErrors,
            PortStat::IpInOctets
            | PortStat::IpOutOctets
            | PortStat::Ipv6InOctets
            | PortStat::Ipv6OutOctets => return None,
        };
        Some(counter)
    }
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn set_port_attribute(&mut self, port_id: Handle, attr: &Attribute<PortAttr>) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let port = ctx.port_from_handle(port_id)?;

        match attr.id {
            PortAttr::AdminState => {
                let up = attr.as_bool()?;
                sdk.port_enable_set(port, up)
                    .map_err(SaiError::sdk("port_enable_set"))?;
                info_log!(SaiApi::Port, port, admin_up = up, "port admin state set");
            }
            PortAttr::PortVlanId => {
                let raw = attr.as_u16()?;
                let vlan = VlanId::new(raw)
                    .map_err(|_| SaiError::InvalidVlanId { vlan: raw.into() })?;
                sdk.port_untagged_vlan_set(port, vlan.as_u16())
                    .map_err(SaiError::sdk("port_untagged_vlan_set"))?;
                debug_log!(SaiApi::Port, port, vlan = raw, "port VLAN set");
            }
            PortAttr::QosSchedulerProfileId => {
                let profile = attr.as_oid()?;
                bind_scheduler(sdk, ctx, port_id, SchedulerTarget::Port(port), profile)?;
            }
            PortAttr::OperStatus
            | PortAttr::Speed
            | PortAttr::QosNumberOfQueues
            | PortAttr::QosQueueList
            | PortAttr::NumberOfIngressPriorityGroups
            | PortAttr::IngressPriorityGroupList => {
                warn_log!(SaiApi::Port, port, attr = attr.id.name(), "read-only port attribute");
                return Err(SaiError::invalid_parameter(format!(
                    "{} is read-only",
                    attr.id.name()
                )));
            }
        }
        Ok(())
    }

    pub fn get_port_attribute(&self, port_id: Handle, attrs: &mut [Attribute<PortAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let port = ctx.port_from_handle(port_id)?;
        let sdk = self.sdk();
        let queues = ctx.queues_per_port();

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                PortAttr::OperStatus => {
                    let up = sdk
                        .port_link_status_get(port)
                        .map_err(SaiError::sdk("port_link_status_get"))?;
                    let status = if up {
                        PortOperStatus::Up
                    } else {
                        PortOperStatus::Down
                    };
                    AttributeValue::S32(status as i32)
                }
                PortAttr::Speed => AttributeValue::U32(
                    sdk.port_speed_get(port)
                        .map_err(SaiError::sdk("port_speed_get"))?,
                ),
                PortAttr::AdminState => AttributeValue::Bool(
                    sdk.port_enable_get(port)
                        .map_err(SaiError::sdk("port_enable_get"))?,
                ),
                PortAttr::PortVlanId => AttributeValue::U16(
                    sdk.port_untagged_vlan_get(port)
                        .map_err(SaiError::sdk("port_untagged_vlan_get"))?,
                ),
                PortAttr::QosSchedulerProfileId => {
                    let bound = ctx.scheduler_bindings.get(&port_id).copied();
                    AttributeValue::Oid(
                        bound.map_or(Handle::NULL, |id| Handle::encode(ObjectType::Scheduler, id)),
                    )
                }
                PortAttr::QosNumberOfQueues => AttributeValue::U32(queues.saturating_mul(2)),
                PortAttr::QosQueueList => {
                    let list = [QueueType::Unicast, QueueType::Multicast]
                        .into_iter()
                        .flat_map(|kind| (0..queues).map(move |i| queue_handle(port, kind, i)))
                        .collect::<SaiResult<Vec<_>>>()?;
                    AttributeValue::OidList(list)
                }
                PortAttr::NumberOfIngressPriorityGroups => AttributeValue::U32(INGRESS_PRIORITY_GROUPS_PER_PORT),
                PortAttr::IngressPriorityGroupList => AttributeValue::OidList(
                    (0..INGRESS_PRIORITY_GROUPS_PER_PORT)
                        .map(|i| ingress_priority_group_handle(port, i))
                        .collect::<SaiResult<Vec<_>>>()?,
                ),
            };
        }
        Ok(())
    }

    /// Reads counters in request order. IP and IPv6 octet counters read 0.
    pub fn get_port_stats(&self, port_id: Handle, counters: &[PortStat]) -> SaiResult<Vec<u64>> {
        let ctx = self.context()?;
        let port = ctx.port_from_handle(port_id)?;
        if counters.is_empty() {
            return Err(SaiError::invalid_parameter("empty counter list"));
        }
        counters
            .iter()
            .map(|stat| match stat.counter() {
                Some(counter) => self
                    .sdk()
                    .port_stat_get(port, counter)
                    .map_err(SaiError::sdk("port_stat_get")),
                None => Ok(0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::switch;
    use crate::error::SaiStatus;
    use crate::sdk::sim::SdkCall;
    use pretty_assertions::assert_eq;

    fn port(p: u32) -> Handle {
        Handle::encode(ObjectType::Port, p)
    }

    #[test]
    fn test_admin_state() {
        let mut sw = switch();
        sw.set_port_attribute(port(2), &Attribute::new(PortAttr::AdminState, AttributeValue::Bool(false)))
            .unwrap();
        let mut attrs = vec![Attribute::query(PortAttr::AdminState)];
        sw.get_port_attribute(port(2), &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::Bool(false));
        assert!(sw.sdk().calls().contains(&SdkCall::PortEnableSet(2, false)));
    }

    #[test]
    fn test_oper_status_follows_link() {
        let sw = switch();
        sw.sdk().set_link(4, true);
        let mut attrs = vec![Attribute::query(PortAttr::OperStatus), Attribute::query(PortAttr::Speed)];
        sw.get_port_attribute(port(4), &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::S32(PortOperStatus::Up as i32));
        assert_eq!(attrs[1].value, AttributeValue::U32(100_000));
    }

    #[test]
    fn test_port_vlan() {
        let mut sw = switch();
        sw.create_vlan(30).unwrap();
        sw.set_port_attribute(port(1), &Attribute::new(PortAttr::PortVlanId, AttributeValue::U16(30)))
            .unwrap();
        let mut attrs = vec![Attribute::query(PortAttr::PortVlanId)];
        sw.get_port_attribute(port(1), &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::U16(30));

        let err = sw
            .set_port_attribute(port(1), &Attribute::new(PortAttr::PortVlanId, AttributeValue::U16(0)))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidVlanId);
    }

    #[test]
    fn test_queue_list() {
        let sw = switch();
        let mut attrs = vec![
            Attribute::query(PortAttr::QosNumberOfQueues),
            Attribute::query(PortAttr::QosQueueList),
        ];
        sw.get_port_attribute(port(3), &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::U32(16));
        let AttributeValue::OidList(list) = &attrs[1].value else {
            panic!("expected a queue list");
        };
        assert_eq!(list.len(), 16);
        assert_eq!(list[0], queue_handle(3, QueueType::Unicast, 0).unwrap());
        assert_eq!(list[8], queue_handle(3, QueueType::Multicast, 0).unwrap());
        assert!(list.iter().all(|q| q.decode_type() == ObjectType::Queue && q.decode_map() == 3));
    }

    #[test]
    fn test_priority_group_list() {
        let sw = switch();
        let mut attrs = vec![
            Attribute::query(PortAttr::NumberOfIngressPriorityGroups),
            Attribute::query(PortAttr::IngressPriorityGroupList),
        ];
        sw.get_port_attribute(port(4), &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::U32(8));
        let AttributeValue::OidList(list) = &attrs[1].value else {
            panic!("expected a priority group list");
        };
        assert_eq!(list.len(), 8);
        assert_eq!(list[7], ingress_priority_group_handle(4, 7).unwrap());
        assert!(list.iter().all(|pg| pg.decode_type() == ObjectType::PriorityGroup));
    }

    #[test]
    fn test_scheduler_binding_type_checked() {
        let mut sw = switch();
        let err = sw
            .set_port_attribute(
                port(1),
                &Attribute::new(
                    PortAttr::QosSchedulerProfileId,
                    AttributeValue::Oid(Handle::encode(ObjectType::Queue, 1)),
                ),
            )
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidObjectType);

        let err = sw
            .set_port_attribute(
                port(1),
                &Attribute::new(
                    PortAttr::QosSchedulerProfileId,
                    AttributeValue::Oid(Handle::encode(ObjectType::Scheduler, 9)),
                ),
            )
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidParameter);
    }

    #[test]
    fn test_read_only_and_bad_ports() {
        let mut sw = switch();
        let err = sw
            .set_port_attribute(port(1), &Attribute::new(PortAttr::Speed, AttributeValue::U32(10)))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidParameter);

        let mut attrs = vec![Attribute::query(PortAttr::Speed)];
        assert_eq!(
            sw.get_port_attribute(port(42), &mut attrs).unwrap_err().status(),
            SaiStatus::InvalidPortNumber
        );
        assert_eq!(
            sw.get_port_attribute(Handle::encode(ObjectType::Lag, 1), &mut attrs)
                .map_err(|e| e.status()),
            Err(SaiStatus::InvalidObjectType)
        );
    }

    #[test]
    fn test_stats() {
        let sw = switch();
        sw.sdk().set_counter(1, PortCounter::InOctets, 1234);
        sw.sdk().set_counter(1, PortCounter::OutErrors, 7);
        let values = sw
            .get_port_stats(
                port(1),
                &[
                    PortStat::IfInOctets,
                    PortStat::IpInOctets,
                    PortStat::IfOutErrors,
                    PortStat::Ipv6OutOctets,
                    PortStat::IfInDiscards,
                ],
            )
            .unwrap();
        assert_eq!(values, vec![1234, 0, 7, 0, 0]);
        assert_eq!(
            sw.get_port_stats(port(1), &[]).unwrap_err().status(),
            SaiStatus::InvalidParameter
        );
    }
}
