//! In-memory SDK.
//!
//! [`SimulatedSdk`] models the subset of SDK state the shim programs (VLANs,
//! L2/L3 tables, ECMP groups, schedulers, buffer pools) closely enough to run
//! the shim without hardware. Every mutating call is recorded in order, a
//! failure can be injected for the next call of a named operation, and link
//! or L2 events can be raised to the registered handler.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use sai_types::MacAddress;

use super::{
    BufferPoolConfig, IngressPgConfig, L2Addr, L2Operation, L2Station, L3Egress, L3Intf, L3Route, PortCounter,
    QueueSelector, SchedulerConfig, SdkCapabilities, SdkError, SdkEvent, SdkEventHandler,
    SdkResult, SwitchControl, SwitchSdk,
};

const DEFAULT_VLAN: u16 = 1;
const EGRESS_ID_BASE: u32 = 100_000;
const ECMP_ID_BASE: u32 = 200_000;

/// A mutating SDK call, as recorded by [`SimulatedSdk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    Attach { hardware_id: String },
    Detach,
    RegisterEvents,
    UnregisterEvents,
    SwitchControlSet(SwitchControl, u32),
    AgeTimerSet(u32),
    PortEnableSet(u32, bool),
    PortUntaggedVlanSet(u32, u16),
    PortSchedulerSet(u32, Option<SchedulerConfig>),
    QueueSchedulerSet(QueueSelector, Option<SchedulerConfig>),
    BufferPoolSet(u32, Option<BufferPoolConfig>),
    IngressPgSet(u32, u32, Option<IngressPgConfig>),
    VlanCreate(u16),
    VlanDestroy(u16),
    VlanDestroyAll,
    VlanPortAdd {
        vlan: u16,
        ports: Vec<u32>,
        untagged: Vec<u32>,
    },
    VlanPortRemove {
        vlan: u16,
        ports: Vec<u32>,
    },
    L2AddrAdd(L2Addr),
    L2AddrDelete(MacAddress, u16),
    L2StationAdd(L2Station),
    L2StationDelete(u32),
    L3IntfCreate(L3Intf),
    L3IntfDelete(u32),
    L3EgressCreate(L3Egress),
    L3EgressDestroy(u32),
    L3RouteAdd(L3Route),
    L3RouteDelete(L3Route),
    EcmpCreate(Vec<u32>),
    EcmpDestroy(u32),
    EcmpAdd(u32, u32),
    EcmpDelete(u32, u32),
}

#[derive(Debug, Clone, Default)]
struct SimPort {
    enabled: bool,
    link_up: bool,
    speed: u32,
    pvid: u16,
    scheduler: Option<SchedulerConfig>,
    counters: HashMap<PortCounter, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanMembers {
    pub ports: BTreeSet<u32>,
    pub untagged: BTreeSet<u32>,
}

#[derive(Default)]
struct SimState {
    attached: bool,
    handler: Option<Arc<dyn SdkEventHandler>>,
    calls: Vec<SdkCall>,
    failures: HashMap<&'static str, SdkError>,
    controls: HashMap<SwitchControl, u32>,
    age_seconds: u32,
    ports: BTreeMap<u32, SimPort>,
    queues: HashMap<QueueSelector, SchedulerConfig>,
    pools: BTreeMap<u32, BufferPoolConfig>,
    ingress_pgs: HashMap<(u32, u32), IngressPgConfig>,
    vlans: BTreeMap<u16, VlanMembers>,
    l2: HashMap<(MacAddress, u16), L2Addr>,
    stations: BTreeMap<u32, L2Station>,
    intfs: BTreeMap<u32, L3Intf>,
    egress: BTreeMap<u32, L3Egress>,
    ecmp: BTreeMap<u32, Vec<u32>>,
    routes: Vec<L3Route>,
}

impl SimState {
    fn port_mut(&mut self, port: u32) -> SdkResult<&mut SimPort> {
        self.ports.get_mut(&port).ok_or(SdkError::Port)
    }

    fn check_ports(&self, ports: &[u32]) -> SdkResult<()> {
        if ports.iter().all(|p| self.ports.contains_key(p)) {
            Ok(())
        } else {
            Err(SdkError::Port)
        }
    }
}

/// Lowest id at or above `base + 1` not present in `map`.
fn next_id<V>(map: &BTreeMap<u32, V>, base: u32) -> u32 {
    (base + 1..)
        .find(|id| !map.contains_key(id))
        .unwrap_or(base)
}

pub struct SimulatedSdk {
    capabilities: SdkCapabilities,
    state: Mutex<SimState>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new(Self::default_capabilities())
    }
}

impl std::fmt::Debug for SimulatedSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedSdk")
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl SimulatedSdk {
    pub fn new(capabilities: SdkCapabilities) -> Self {
        Self {
            capabilities,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Eight ports (1..=8) with eight queues each, 16 VRFs, 64 interfaces.
    pub fn default_capabilities() -> SdkCapabilities {
        SdkCapabilities {
            max_vrf: 16,
            max_l3_intf: 64,
            cpu_port: 0,
            ports: (1..=8).collect(),
            queues_per_port: 8,
            max_buffer_pools: 4,
            max_buffer_profiles: 16,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `f` against attached state, honoring injected failures.
    fn with_state<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut SimState) -> SdkResult<T>,
    ) -> SdkResult<T> {
        let mut state = self.lock();
        if let Some(err) = state.failures.remove(op) {
            return Err(err);
        }
        if !state.attached {
            return Err(SdkError::Init);
        }
        f(&mut state)
    }

    /// Makes the next call of `op` (the trait method name) fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: SdkError) {
        self.lock().failures.insert(op, err);
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<SdkCall> {
        std::mem::take(&mut self.lock().calls)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    pub fn has_event_handler(&self) -> bool {
        self.lock().handler.is_some()
    }

    /// Delivers `event` to the registered handler, outside the state lock.
    pub fn raise_event(&self, event: SdkEvent) {
        let handler = self.lock().handler.clone();
        if let Some(handler) = handler {
            handler.on_event(event);
        }
    }

    /// Changes link state and raises the matching event.
    pub fn set_link(&self, port: u32, up: bool) {
        if let Some(p) = self.lock().ports.get_mut(&port) {
            p.link_up = up;
        }
        self.raise_event(SdkEvent::LinkStatus { port, up });
    }

    /// Simulates hardware learning (or aging) of an L2 address.
    pub fn learn(&self, addr: L2Addr, operation: L2Operation) {
        {
            let mut state = self.lock();
            let key = (addr.mac, addr.vlan);
            match operation {
                L2Operation::Add | L2Operation::Move => {
                    state.l2.insert(key, addr.clone());
                }
                L2Operation::Delete => {
                    state.l2.remove(&key);
                }
                L2Operation::Report => {}
            }
        }
        self.raise_event(SdkEvent::L2Addr { addr, operation });
    }

    pub fn set_counter(&self, port: u32, counter: PortCounter, value: u64) {
        if let Some(p) = self.lock().ports.get_mut(&port) {
            p.counters.insert(counter, value);
        }
    }

    pub fn vlan_members(&self, vlan: u16) -> Option<VlanMembers> {
        self.lock().vlans.get(&vlan).cloned()
    }

    pub fn vlan_exists(&self, vlan: u16) -> bool {
        self.lock().vlans.contains_key(&vlan)
    }

    pub fn port_scheduler(&self, port: u32) -> Option<SchedulerConfig> {
        self.lock().ports.get(&port).and_then(|p| p.scheduler)
    }

    pub fn queue_scheduler(&self, queue: QueueSelector) -> Option<SchedulerConfig> {
        self.lock().queues.get(&queue).copied()
    }

    pub fn buffer_pool(&self, pool: u32) -> Option<BufferPoolConfig> {
        self.lock().pools.get(&pool).copied()
    }

    pub fn ingress_pg(&self, port: u32, pg: u32) -> Option<IngressPgConfig> {
        self.lock().ingress_pgs.get(&(port, pg)).copied()
    }

    pub fn l2_entry(&self, mac: MacAddress, vlan: u16) -> Option<L2Addr> {
        self.lock().l2.get(&(mac, vlan)).cloned()
    }

    pub fn intf(&self, intf_id: u32) -> Option<L3Intf> {
        self.lock().intfs.get(&intf_id).cloned()
    }

    pub fn egress(&self, egress_id: u32) -> Option<L3Egress> {
        self.lock().egress.get(&egress_id).cloned()
    }

    pub fn ecmp_members(&self, ecmp_id: u32) -> Option<Vec<u32>> {
        self.lock().ecmp.get(&ecmp_id).cloned()
    }

    pub fn routes(&self) -> Vec<L3Route> {
        self.lock().routes.clone()
    }

    pub fn station_count(&self) -> usize {
        self.lock().stations.len()
    }

    pub fn switch_control(&self, control: SwitchControl) -> Option<u32> {
        self.lock().controls.get(&control).copied()
    }

    pub fn age_timer(&self) -> u32 {
        self.lock().age_seconds
    }
}

impl SwitchSdk for SimulatedSdk {
    fn attach(&self, hardware_id: &str, _config_file: Option<&str>) -> SdkResult<()> {
        let mut state = self.lock();
        if let Some(err) = state.failures.remove("attach") {
            return Err(err);
        }
        if state.attached {
            return Err(SdkError::Exists);
        }
        state.attached = true;
        state.calls.push(SdkCall::Attach {
            hardware_id: hardware_id.to_string(),
        });
        state.ports = self
            .capabilities
            .ports
            .iter()
            .map(|&p| {
                let port = SimPort {
                    enabled: true,
                    speed: 100_000,
                    pvid: DEFAULT_VLAN,
                    ..SimPort::default()
                };
                (p, port)
            })
            .collect();
        let all: BTreeSet<u32> = self.capabilities.ports.iter().copied().collect();
        state.vlans.insert(
            DEFAULT_VLAN,
            VlanMembers {
                ports: all.clone(),
                untagged: all,
            },
        );
        Ok(())
    }

    fn detach(&self) -> SdkResult<()> {
        self.with_state("detach", |s| {
            let calls = std::mem::take(&mut s.calls);
            *s = SimState::default();
            s.calls = calls;
            s.calls.push(SdkCall::Detach);
            Ok(())
        })
    }

    fn capabilities(&self) -> SdkResult<SdkCapabilities> {
        self.with_state("capabilities", |_| Ok(self.capabilities.clone()))
    }

    fn register_event_handler(&self, handler: Arc<dyn SdkEventHandler>) -> SdkResult<()> {
        self.with_state("register_event_handler", |s| {
            s.handler = Some(handler);
            s.calls.push(SdkCall::RegisterEvents);
            Ok(())
        })
    }

    fn unregister_event_handler(&self) -> SdkResult<()> {
        self.with_state("unregister_event_handler", |s| {
            s.handler = None;
            s.calls.push(SdkCall::UnregisterEvents);
            Ok(())
        })
    }

    fn switch_control_set(&self, control: SwitchControl, value: u32) -> SdkResult<()> {
        self.with_state("switch_control_set", |s| {
            s.controls.insert(control, value);
            s.calls.push(SdkCall::SwitchControlSet(control, value));
            Ok(())
        })
    }

    fn l2_age_timer_set(&self, seconds: u32) -> SdkResult<()> {
        self.with_state("l2_age_timer_set", |s| {
            s.age_seconds = seconds;
            s.calls.push(SdkCall::AgeTimerSet(seconds));
            Ok(())
        })
    }

    fn port_enable_set(&self, port: u32, enable: bool) -> SdkResult<()> {
        self.with_state("port_enable_set", |s| {
            s.port_mut(port)?.enabled = enable;
            s.calls.push(SdkCall::PortEnableSet(port, enable));
            Ok(())
        })
    }

    fn port_enable_get(&self, port: u32) -> SdkResult<bool> {
        self.with_state("port_enable_get", |s| Ok(s.port_mut(port)?.enabled))
    }

    fn port_link_status_get(&self, port: u32) -> SdkResult<bool> {
        self.with_state("port_link_status_get", |s| Ok(s.port_mut(port)?.link_up))
    }

    fn port_speed_get(&self, port: u32) -> SdkResult<u32> {
        self.with_state("port_speed_get", |s| Ok(s.port_mut(port)?.speed))
    }

    fn port_untagged_vlan_set(&self, port: u32, vlan: u16) -> SdkResult<()> {
        self.with_state("port_untagged_vlan_set", |s| {
            if !s.vlans.contains_key(&vlan) {
                return Err(SdkError::NotFound);
            }
            s.port_mut(port)?.pvid = vlan;
            s.calls.push(SdkCall::PortUntaggedVlanSet(port, vlan));
            Ok(())
        })
    }

    fn port_untagged_vlan_get(&self, port: u32) -> SdkResult<u16> {
        self.with_state("port_untagged_vlan_get", |s| Ok(s.port_mut(port)?.pvid))
    }

    fn port_stat_get(&self, port: u32, counter: PortCounter) -> SdkResult<u64> {
        self.with_state("port_stat_get", |s| {
            Ok(s.port_mut(port)?
                .counters
                .get(&counter)
                .copied()
                .unwrap_or(0))
        })
    }

    fn port_scheduler_set(&self, port: u32, config: Option<&SchedulerConfig>) -> SdkResult<()> {
        self.with_state("port_scheduler_set", |s| {
            s.port_mut(port)?.scheduler = config.copied();
            s.calls.push(SdkCall::PortSchedulerSet(port, config.copied()));
            Ok(())
        })
    }

    fn queue_scheduler_set(
        &self,
        queue: QueueSelector,
        config: Option<&SchedulerConfig>,
    ) -> SdkResult<()> {
        let queues = self.capabilities.queues_per_port;
        self.with_state("queue_scheduler_set", |s| {
            s.port_mut(queue.port)?;
            if queue.index >= queues {
                return Err(SdkError::Param);
            }
            match config {
                Some(c) => s.queues.insert(queue, *c),
                None => s.queues.remove(&queue),
            };
            s.calls.push(SdkCall::QueueSchedulerSet(queue, config.copied()));
            Ok(())
        })
    }

    fn buffer_pool_set(&self, pool: u32, config: Option<&BufferPoolConfig>) -> SdkResult<()> {
        let max = self.capabilities.max_buffer_pools;
        self.with_state("buffer_pool_set", |s| {
            if pool == 0 || pool > max {
                return Err(SdkError::Param);
            }
            match config {
                Some(c) => s.pools.insert(pool, *c),
                None => s.pools.remove(&pool),
            };
            s.calls.push(SdkCall::BufferPoolSet(pool, config.copied()));
            Ok(())
        })
    }

    fn ingress_pg_set(&self, port: u32, pg: u32, config: Option<&IngressPgConfig>) -> SdkResult<()> {
        self.with_state("ingress_pg_set", |s| {
            s.port_mut(port)?;
            match config {
                Some(c) => {
                    if !s.pools.contains_key(&c.pool) {
                        return Err(SdkError::NotFound);
                    }
                    s.ingress_pgs.insert((port, pg), *c);
                }
                None => {
                    s.ingress_pgs.remove(&(port, pg));
                }
            }
            s.calls.push(SdkCall::IngressPgSet(port, pg, config.copied()));
            Ok(())
        })
    }

    fn vlan_create(&self, vlan: u16) -> SdkResult<()> {
        self.with_state("vlan_create", |s| {
            if s.vlans.contains_key(&vlan) {
                return Err(SdkError::Exists);
            }
            s.vlans.insert(vlan, VlanMembers::default());
            s.calls.push(SdkCall::VlanCreate(vlan));
            Ok(())
        })
    }

    fn vlan_destroy(&self, vlan: u16) -> SdkResult<()> {
        self.with_state("vlan_destroy", |s| {
            if vlan == DEFAULT_VLAN {
                return Err(SdkError::Param);
            }
            s.vlans.remove(&vlan).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::VlanDestroy(vlan));
            Ok(())
        })
    }

    fn vlan_destroy_all(&self) -> SdkResult<()> {
        self.with_state("vlan_destroy_all", |s| {
            s.vlans.retain(|&v, _| v == DEFAULT_VLAN);
            s.calls.push(SdkCall::VlanDestroyAll);
            Ok(())
        })
    }

    fn vlan_default_get(&self) -> SdkResult<u16> {
        self.with_state("vlan_default_get", |_| Ok(DEFAULT_VLAN))
    }

    fn vlan_port_add(&self, vlan: u16, ports: &[u32], untagged: &[u32]) -> SdkResult<()> {
        self.with_state("vlan_port_add", |s| {
            s.check_ports(ports)?;
            let members = s.vlans.get_mut(&vlan).ok_or(SdkError::NotFound)?;
            members.ports.extend(ports.iter().copied());
            members.untagged.extend(untagged.iter().copied());
            s.calls.push(SdkCall::VlanPortAdd {
                vlan,
                ports: ports.to_vec(),
                untagged: untagged.to_vec(),
            });
            Ok(())
        })
    }

    fn vlan_port_remove(&self, vlan: u16, ports: &[u32]) -> SdkResult<()> {
        self.with_state("vlan_port_remove", |s| {
            s.check_ports(ports)?;
            let members = s.vlans.get_mut(&vlan).ok_or(SdkError::NotFound)?;
            for p in ports {
                members.ports.remove(p);
                members.untagged.remove(p);
            }
            s.calls.push(SdkCall::VlanPortRemove {
                vlan,
                ports: ports.to_vec(),
            });
            Ok(())
        })
    }

    fn l2_addr_add(&self, addr: &L2Addr) -> SdkResult<()> {
        self.with_state("l2_addr_add", |s| {
            s.port_mut(addr.port)?;
            let key = (addr.mac, addr.vlan);
            if s.l2.contains_key(&key) && !addr.replace {
                return Err(SdkError::Exists);
            }
            let mut stored = addr.clone();
            stored.replace = false;
            s.l2.insert(key, stored);
            s.calls.push(SdkCall::L2AddrAdd(addr.clone()));
            Ok(())
        })
    }

    fn l2_addr_delete(&self, mac: MacAddress, vlan: u16) -> SdkResult<()> {
        self.with_state("l2_addr_delete", |s| {
            s.l2.remove(&(mac, vlan)).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::L2AddrDelete(mac, vlan));
            Ok(())
        })
    }

    fn l2_addr_get(&self, mac: MacAddress, vlan: u16) -> SdkResult<L2Addr> {
        self.with_state("l2_addr_get", |s| {
            s.l2.get(&(mac, vlan)).cloned().ok_or(SdkError::NotFound)
        })
    }

    fn l2_station_add(&self, station: &L2Station) -> SdkResult<u32> {
        self.with_state("l2_station_add", |s| {
            let id = next_id(&s.stations, 0);
            s.stations.insert(id, station.clone());
            s.calls.push(SdkCall::L2StationAdd(station.clone()));
            Ok(id)
        })
    }

    fn l2_station_delete(&self, station_id: u32) -> SdkResult<()> {
        self.with_state("l2_station_delete", |s| {
            s.stations.remove(&station_id).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::L2StationDelete(station_id));
            Ok(())
        })
    }

    fn l3_intf_create(&self, intf: &L3Intf) -> SdkResult<u32> {
        let max = self.capabilities.max_l3_intf;
        self.with_state("l3_intf_create", |s| {
            let id = next_id(&s.intfs, 0);
            if id > max {
                return Err(SdkError::Full);
            }
            s.intfs.insert(id, intf.clone());
            s.calls.push(SdkCall::L3IntfCreate(intf.clone()));
            Ok(id)
        })
    }

    fn l3_intf_delete(&self, intf_id: u32) -> SdkResult<()> {
        self.with_state("l3_intf_delete", |s| {
            s.intfs.remove(&intf_id).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::L3IntfDelete(intf_id));
            Ok(())
        })
    }

    fn l3_egress_create(&self, egress: &L3Egress) -> SdkResult<u32> {
        self.with_state("l3_egress_create", |s| {
            if !s.intfs.contains_key(&egress.intf) {
                return Err(SdkError::NotFound);
            }
            let id = next_id(&s.egress, EGRESS_ID_BASE);
            s.egress.insert(id, egress.clone());
            s.calls.push(SdkCall::L3EgressCreate(egress.clone()));
            Ok(id)
        })
    }

    fn l3_egress_destroy(&self, egress_id: u32) -> SdkResult<()> {
        self.with_state("l3_egress_destroy", |s| {
            s.egress.remove(&egress_id).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::L3EgressDestroy(egress_id));
            Ok(())
        })
    }

    fn l3_route_add(&self, route: &L3Route) -> SdkResult<()> {
        self.with_state("l3_route_add", |s| {
            let target_exists = if route.multipath {
                s.ecmp.contains_key(&route.egress)
            } else {
                s.egress.contains_key(&route.egress)
            };
            if !target_exists {
                return Err(SdkError::NotFound);
            }
            let duplicate = s.routes.iter().any(|r| {
                r.vrf == route.vrf && r.subnet == route.subnet && r.mask == route.mask
            });
            if duplicate {
                return Err(SdkError::Exists);
            }
            s.routes.push(route.clone());
            s.calls.push(SdkCall::L3RouteAdd(route.clone()));
            Ok(())
        })
    }

    fn l3_route_delete(&self, route: &L3Route) -> SdkResult<()> {
        self.with_state("l3_route_delete", |s| {
            let pos = s
                .routes
                .iter()
                .position(|r| r.vrf == route.vrf && r.subnet == route.subnet && r.mask == route.mask)
                .ok_or(SdkError::NotFound)?;
            s.routes.remove(pos);
            s.calls.push(SdkCall::L3RouteDelete(route.clone()));
            Ok(())
        })
    }

    fn l3_ecmp_create(&self, members: &[u32]) -> SdkResult<u32> {
        self.with_state("l3_ecmp_create", |s| {
            if members.is_empty() {
                return Err(SdkError::Param);
            }
            if !members.iter().all(|m| s.egress.contains_key(m)) {
                return Err(SdkError::NotFound);
            }
            let id = next_id(&s.ecmp, ECMP_ID_BASE);
            s.ecmp.insert(id, members.to_vec());
            s.calls.push(SdkCall::EcmpCreate(members.to_vec()));
            Ok(id)
        })
    }

    fn l3_ecmp_destroy(&self, ecmp_id: u32) -> SdkResult<()> {
        self.with_state("l3_ecmp_destroy", |s| {
            s.ecmp.remove(&ecmp_id).ok_or(SdkError::NotFound)?;
            s.calls.push(SdkCall::EcmpDestroy(ecmp_id));
            Ok(())
        })
    }

    fn l3_ecmp_add(&self, ecmp_id: u32, member: u32) -> SdkResult<()> {
        self.with_state("l3_ecmp_add", |s| {
            if !s.egress.contains_key(&member) {
                return Err(SdkError::NotFound);
            }
            let group = s.ecmp.get_mut(&ecmp_id).ok_or(SdkError::NotFound)?;
            if group.contains(&member) {
                return Err(SdkError::Exists);
            }
            group.push(member);
            s.calls.push(SdkCall::EcmpAdd(ecmp_id, member));
            Ok(())
        })
    }

    fn l3_ecmp_delete(&self, ecmp_id: u32, member: u32) -> SdkResult<()> {
        self.with_state("l3_ecmp_delete", |s| {
            let group = s.ecmp.get_mut(&ecmp_id).ok_or(SdkError::NotFound)?;
            let pos = group
                .iter()
                .position(|m| *m == member)
                .ok_or(SdkError::NotFound)?;
            group.remove(pos);
            s.calls.push(SdkCall::EcmpDelete(ecmp_id, member));
            Ok(())
        })
    }

    fn l3_ecmp_get(&self, ecmp_id: u32) -> SdkResult<Vec<u32>> {
        self.with_state("l3_ecmp_get", |s| {
            s.ecmp.get(&ecmp_id).cloned().ok_or(SdkError::NotFound)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{EgressKind, L2Action};
    use pretty_assertions::assert_eq;

    fn attached() -> SimulatedSdk {
        let sdk = SimulatedSdk::default();
        sdk.attach("unit0", None).unwrap();
        sdk
    }

    #[test]
    fn test_requires_attach() {
        let sdk = SimulatedSdk::default();
        assert_eq!(sdk.vlan_create(10), Err(SdkError::Init));
        sdk.attach("unit0", None).unwrap();
        assert_eq!(sdk.attach("unit0", None), Err(SdkError::Exists));
        assert_eq!(sdk.vlan_default_get(), Ok(1));
        assert_eq!(sdk.vlan_members(1).unwrap().ports.len(), 8);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let sdk = attached();
        sdk.fail_next("vlan_create", SdkError::Full);
        assert_eq!(sdk.vlan_create(10), Err(SdkError::Full));
        assert_eq!(sdk.vlan_create(10), Ok(()));
        assert_eq!(sdk.vlan_create(10), Err(SdkError::Exists));
    }

    #[test]
    fn test_l3_ids() {
        let sdk = attached();
        let intf = L3Intf {
            mac: MacAddress::new([0, 1, 2, 3, 4, 5]),
            vlan: 1,
            vrf: 1,
            ttl: 64,
        };
        let i1 = sdk.l3_intf_create(&intf).unwrap();
        let i2 = sdk.l3_intf_create(&intf).unwrap();
        assert_eq!((i1, i2), (1, 2));

        let eg = L3Egress {
            intf: i1,
            src_mac: intf.mac,
            kind: EgressKind::Discard,
        };
        let e1 = sdk.l3_egress_create(&eg).unwrap();
        assert_eq!(e1, EGRESS_ID_BASE + 1);
        assert_eq!(
            sdk.l3_egress_create(&L3Egress { intf: 99, ..eg }),
            Err(SdkError::NotFound)
        );

        let ecmp = sdk.l3_ecmp_create(&[e1]).unwrap();
        assert_eq!(sdk.l3_ecmp_get(ecmp).unwrap(), vec![e1]);
        assert_eq!(sdk.l3_ecmp_create(&[]), Err(SdkError::Param));
    }

    #[test]
    fn test_l2_replace() {
        let sdk = attached();
        let mut addr = L2Addr {
            mac: MacAddress::new([0, 0, 0, 0, 0, 1]),
            vlan: 1,
            port: 2,
            is_static: true,
            action: L2Action::Forward,
            replace: false,
        };
        sdk.l2_addr_add(&addr).unwrap();
        assert_eq!(sdk.l2_addr_add(&addr), Err(SdkError::Exists));
        addr.port = 3;
        addr.replace = true;
        sdk.l2_addr_add(&addr).unwrap();
        assert_eq!(sdk.l2_addr_get(addr.mac, 1).unwrap().port, 3);
    }

    #[test]
    fn test_detach_resets_state_but_keeps_log() {
        let sdk = attached();
        sdk.vlan_create(20).unwrap();
        sdk.detach().unwrap();
        assert!(!sdk.is_attached());
        assert!(!sdk.vlan_exists(20));
        let calls = sdk.calls();
        assert_eq!(calls.last(), Some(&SdkCall::Detach));
        assert!(calls.contains(&SdkCall::VlanCreate(20)));
    }
}
