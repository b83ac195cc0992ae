//! End-to-end tests driving the shim through its public API over the
//! simulated SDK.

use std::io::Write;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use sai_types::MacAddress;

use sai_shim::api::neighbor::{NeighborAttr, NeighborEntry};
use sai_shim::api::next_hop::{NextHopAttr, NEXT_HOP_TYPE_IP};
use sai_shim::api::next_hop_group::{NextHopGroupAttr, NEXT_HOP_GROUP_TYPE_ECMP};
use sai_shim::api::port::PortAttr;
use sai_shim::api::route::{RouteAttr, RouteEntry};
use sai_shim::api::router_interface::{RouterInterfaceAttr, RouterInterfaceType};
use sai_shim::api::scheduler::SchedulerAttr;
use sai_shim::api::virtual_router::VirtualRouterAttr;
use sai_shim::api::PacketAction;
use sai_shim::sdk::sim::{SdkCall, SimulatedSdk};
use sai_shim::sdk::{EgressKind, L2Addr, L2Action, L2Operation};
use sai_shim::{
    Attribute, AttributeValue, FdbEventNotification, FdbEventType, Handle, ObjectType,
    PortOperStatus, PortOperStatusNotification, SaiStatus, SaiSwitch, SwitchNotifications,
    SwitchProfile, SwitchState,
};

#[derive(Default)]
struct Recorder {
    ports: Mutex<Vec<PortOperStatusNotification>>,
    fdb: Mutex<Vec<FdbEventNotification>>,
}

impl SwitchNotifications for Recorder {
    fn on_port_state_change(&self, changes: &[PortOperStatusNotification]) {
        self.ports.lock().unwrap().extend_from_slice(changes);
    }

    fn on_fdb_event(&self, events: &[FdbEventNotification]) {
        self.fdb.lock().unwrap().extend_from_slice(events);
    }
}

const ROUTER_MAC: MacAddress = MacAddress::new([0x02, 0x42, 0xac, 0x11, 0x00, 0x01]);

fn port(p: u32) -> Handle {
    Handle::encode(ObjectType::Port, p)
}

fn bring_up() -> (SaiSwitch<SimulatedSdk>, Arc<Recorder>) {
    let host = Arc::new(Recorder::default());
    let mut sw = SaiSwitch::new(Arc::new(SimulatedSdk::default()));
    let profile = SwitchProfile {
        switch_mac: Some(ROUTER_MAC),
        ..SwitchProfile::default()
    };
    sw.initialize("0000:03:00.0", profile, host.clone()).unwrap();
    (sw, host)
}

#[test]
fn test_lifecycle_and_events() {
    let (mut sw, host) = bring_up();
    assert_eq!(sw.state(), SwitchState::Connected);

    sw.sdk().set_link(2, true);
    sw.sdk().learn(
        L2Addr {
            mac: MacAddress::new([0, 1, 2, 3, 4, 5]),
            vlan: 1,
            port: 2,
            is_static: false,
            action: L2Action::Forward,
            replace: false,
        },
        L2Operation::Add,
    );

    {
        let ports = host.ports.lock().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port_id, port(2));
        assert_eq!(ports[0].port_state, PortOperStatus::Up);
        let fdb = host.fdb.lock().unwrap();
        assert_eq!(fdb[0].event_type, FdbEventType::Learned);
        assert_eq!(fdb[0].fdb_entry.vlan, 1);
    }

    sw.disconnect();
    assert_eq!(sw.state(), SwitchState::Initialized);
    sw.sdk().set_link(2, false);
    assert_eq!(host.ports.lock().unwrap().len(), 1);

    sw.shutdown(false).unwrap();
    assert_eq!(sw.state(), SwitchState::Uninitialized);
    assert!(!sw.sdk().is_attached());
    assert_eq!(sw.create_vlan(10).unwrap_err().status(), SaiStatus::Uninitialized);
}

#[test]
fn test_profile_file_drives_init() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"SAI_SWITCH_MAC": "02:00:00:00:00:aa", "SAI_NUM_QUEUES_PER_PORT": 4}}"#
    )
    .unwrap();
    let profile = SwitchProfile::from_file(file.path()).unwrap();

    let mut sw = SaiSwitch::new(Arc::new(SimulatedSdk::default()));
    sw.initialize("unit0", profile, Arc::new(Recorder::default()))
        .unwrap();

    let mut attrs = vec![Attribute::query(PortAttr::QosNumberOfQueues)];
    sw.get_port_attribute(port(1), &mut attrs).unwrap();
    assert_eq!(attrs[0].value, AttributeValue::U32(8));

    let vr = sw.create_virtual_router(&[]).unwrap();
    let mut attrs = vec![Attribute::query(VirtualRouterAttr::SrcMacAddress)];
    sw.get_virtual_router_attribute(vr, &mut attrs).unwrap();
    assert_eq!(
        attrs[0].value,
        AttributeValue::Mac("02:00:00:00:00:aa".parse().unwrap())
    );
}

#[test]
fn test_scheduler_change_reaches_every_port() {
    let (mut sw, _) = bring_up();
    let sched = sw
        .create_scheduler_profile(&[
            Attribute::new(SchedulerAttr::SchedulingWeight, AttributeValue::U8(10)),
            Attribute::new(SchedulerAttr::MaxBandwidthRate, AttributeValue::U64(1_250_000)),
        ])
        .unwrap();
    for p in [1, 2] {
        sw.set_port_attribute(
            port(p),
            &Attribute::new(PortAttr::QosSchedulerProfileId, AttributeValue::Oid(sched)),
        )
        .unwrap();
    }

    sw.set_scheduler_attribute(
        sched,
        &Attribute::new(SchedulerAttr::SchedulingWeight, AttributeValue::U8(50)),
    )
    .unwrap();

    for p in [1, 2] {
        let config = sw.sdk().port_scheduler(p).unwrap();
        assert_eq!(config.weight, 50);
        assert_eq!(config.max_rate, 10_000);
    }
    let mut attrs = vec![Attribute::query(PortAttr::QosSchedulerProfileId)];
    sw.get_port_attribute(port(2), &mut attrs).unwrap();
    assert_eq!(attrs[0].value, AttributeValue::Oid(sched));

    sw.remove_scheduler_profile(sched).unwrap();
    assert_eq!(sw.sdk().port_scheduler(1), None);
    assert_eq!(sw.sdk().port_scheduler(2), None);
}

#[test]
fn test_routed_port_with_ecmp_route() {
    let (mut sw, _) = bring_up();
    let vr = sw.create_virtual_router(&[]).unwrap();
    let rif = sw
        .create_router_interface(&[
            Attribute::new(
                RouterInterfaceAttr::Type,
                AttributeValue::S32(RouterInterfaceType::Port as i32),
            ),
            Attribute::new(RouterInterfaceAttr::VirtualRouterId, AttributeValue::Oid(vr)),
            Attribute::new(RouterInterfaceAttr::PortId, AttributeValue::Oid(port(5))),
        ])
        .unwrap();
    assert_eq!(sw.object_type_query(rif), ObjectType::RouterInterface);
    assert_eq!(sw.sdk().intf(rif.index()).unwrap().mac, ROUTER_MAC);

    // Next hops resolve through neighbors on the new interface.
    let neighbors: Vec<NeighborEntry> = (0..2u8)
        .map(|i| NeighborEntry {
            rif_id: rif,
            ip_address: IpAddr::from([10, 20, 0, 10 + i]),
        })
        .collect();
    let next_hops: Vec<Handle> = neighbors
        .iter()
        .zip(0u8..)
        .map(|(neighbor, i)| {
            sw.create_neighbor_entry(
                neighbor,
                &[Attribute::new(
                    NeighborAttr::DstMacAddress,
                    AttributeValue::Mac(MacAddress::new([0x02, 0, 0, 0, 1, i])),
                )],
            )
            .unwrap();
            sw.create_next_hop(&[
                Attribute::new(NextHopAttr::Type, AttributeValue::S32(NEXT_HOP_TYPE_IP)),
                Attribute::new(NextHopAttr::Ip, AttributeValue::Ip(neighbor.ip_address)),
                Attribute::new(NextHopAttr::RouterInterfaceId, AttributeValue::Oid(rif)),
            ])
            .unwrap()
        })
        .collect();
    for (hop, i) in next_hops.iter().zip(0u8..) {
        assert_eq!(
            sw.sdk().egress(hop.index()).unwrap().kind,
            EgressKind::Forward {
                port: 5,
                dst_mac: MacAddress::new([0x02, 0, 0, 0, 1, i]),
            }
        );
    }
    let group = sw
        .create_next_hop_group(&[
            Attribute::new(
                NextHopGroupAttr::Type,
                AttributeValue::S32(NEXT_HOP_GROUP_TYPE_ECMP),
            ),
            Attribute::new(NextHopGroupAttr::NextHopList, AttributeValue::OidList(next_hops.clone())),
        ])
        .unwrap();

    let entry = RouteEntry {
        vr_id: vr,
        destination: "10.20.30.0/24".parse().unwrap(),
    };
    sw.create_route(
        &entry,
        &[
            Attribute::new(RouteAttr::NextHopId, AttributeValue::Oid(group)),
            Attribute::new(
                RouteAttr::PacketAction,
                AttributeValue::S32(PacketAction::Forward as i32),
            ),
        ],
    )
    .unwrap();

    let routes = sw.sdk().routes();
    assert_eq!(routes.len(), 1);
    assert!(routes[0].multipath);
    assert_eq!(routes[0].subnet, "10.20.30.0".parse::<IpAddr>().unwrap());
    assert!(sw
        .sdk()
        .calls()
        .iter()
        .any(|c| matches!(c, SdkCall::L3RouteAdd(r) if r.egress == group.index())));

    sw.remove_route(&entry).unwrap();
    sw.remove_next_hop_group(group).unwrap();
    assert_eq!(
        sw.remove_router_interface(rif).unwrap_err().status(),
        SaiStatus::ObjectInUse
    );
    for hop in next_hops {
        sw.remove_next_hop(hop).unwrap();
    }
    sw.remove_all_neighbor_entries().unwrap();
    assert_eq!(
        sw.remove_virtual_router(vr).unwrap_err().status(),
        SaiStatus::ObjectInUse
    );
    sw.remove_router_interface(rif).unwrap();
    sw.remove_virtual_router(vr).unwrap();
    assert!(sw.sdk().routes().is_empty());
    assert_eq!(sw.max_unused_vlan_id().unwrap(), Some(4094));
}

#[test]
fn test_api_surface() {
    let (sw, _) = bring_up();
    assert!(sw.api_query(sai_shim::SaiApi::Route).is_ok());
    assert_eq!(
        sw.api_query(sai_shim::SaiApi::Acl).unwrap_err().status(),
        SaiStatus::NotImplemented
    );
    assert_eq!(
        sw.object_type_query(Handle::from_raw(0x0000_00fe_0000_0001)),
        ObjectType::Null
    );
}
