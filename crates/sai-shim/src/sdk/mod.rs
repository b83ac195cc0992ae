//! Boundary to the switch-ASIC SDK.
//!
//! The SDK owns every hardware resource; the shim only ever talks to it
//! through [`SwitchSdk`]. Implementations wrap the vendor's C function table
//! (or, for tests and dry runs, [`sim::SimulatedSdk`]). All methods take
//! `&self`: the vendor library serializes internally and raises events from
//! its own threads, so implementations are expected to be `Send + Sync`.

pub mod sim;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use sai_types::MacAddress;

/// Error codes returned by the SDK.
///
/// Discriminants follow the SDK's numeric codes; `0` is success and is not
/// representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SdkError {
    #[error("internal error")]
    Internal,
    #[error("out of memory")]
    Memory,
    #[error("invalid unit")]
    Unit,
    #[error("invalid parameter")]
    Param,
    #[error("table empty")]
    Empty,
    #[error("table full")]
    Full,
    #[error("entry not found")]
    NotFound,
    #[error("entry exists")]
    Exists,
    #[error("operation timed out")]
    Timeout,
    #[error("operation still running")]
    Busy,
    #[error("operation failed")]
    Fail,
    #[error("operation disabled")]
    Disabled,
    #[error("invalid identifier")]
    BadId,
    #[error("no resources for operation")]
    Resource,
    #[error("invalid configuration")]
    Config,
    #[error("feature unavailable")]
    Unavail,
    #[error("feature not initialized")]
    Init,
    #[error("invalid port")]
    Port,
    #[error("unknown error code {0}")]
    Unknown(i32),
}

impl SdkError {
    /// Numeric SDK return code.
    pub fn code(&self) -> i32 {
        match self {
            SdkError::Internal => -1,
            SdkError::Memory => -2,
            SdkError::Unit => -3,
            SdkError::Param => -4,
            SdkError::Empty => -5,
            SdkError::Full => -6,
            SdkError::NotFound => -7,
            SdkError::Exists => -8,
            SdkError::Timeout => -9,
            SdkError::Busy => -10,
            SdkError::Fail => -11,
            SdkError::Disabled => -12,
            SdkError::BadId => -13,
            SdkError::Resource => -14,
            SdkError::Config => -15,
            SdkError::Unavail => -16,
            SdkError::Init => -17,
            SdkError::Port => -18,
            SdkError::Unknown(code) => *code,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

/// Sizes and port layout reported by the SDK after bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkCapabilities {
    pub max_vrf: u32,
    pub max_l3_intf: u32,
    pub cpu_port: u32,
    /// Front-panel ports, in SDK numbering.
    pub ports: Vec<u32>,
    pub queues_per_port: u32,
    pub max_buffer_pools: u32,
    pub max_buffer_profiles: u32,
}

/// L3 interface (router MAC + VLAN + VRF binding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Intf {
    pub mac: MacAddress,
    pub vlan: u16,
    pub vrf: u32,
    pub ttl: u8,
}

/// What an egress object does with matching traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EgressKind {
    /// Forward to `port` rewriting the destination MAC.
    Forward { port: u32, dst_mac: MacAddress },
    /// Discard at the destination lookup.
    Discard,
    /// Punt to the CPU.
    CopyToCpu,
}

/// L3 egress object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Egress {
    pub intf: u32,
    pub src_mac: MacAddress,
    pub kind: EgressKind,
}

/// Route programmed into the L3 table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Route {
    pub vrf: u32,
    pub subnet: IpAddr,
    pub mask: IpAddr,
    /// Egress object, or ECMP group when `multipath` is set.
    pub egress: u32,
    pub multipath: bool,
    pub copy_to_cpu: bool,
}

/// Station MAC entry so routed frames terminate on the router MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Station {
    pub mac: MacAddress,
    pub vlan: u16,
    pub ipv4: bool,
    pub ipv6: bool,
}

/// Forwarding behavior attached to an L2 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum L2Action {
    #[default]
    Forward,
    DiscardSrc,
    DiscardDst,
    CopyToCpu,
    /// Discard the frame but copy it to the CPU.
    Trap,
}

/// L2 table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Addr {
    pub mac: MacAddress,
    pub vlan: u16,
    pub port: u32,
    pub is_static: bool,
    pub action: L2Action,
    /// Overwrite an existing entry instead of failing with `Exists`.
    pub replace: bool,
}

/// How a shaper interprets its rate and burst fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaperUnit {
    /// kbit/s and kbit.
    #[default]
    Kbits,
    /// packets/s and packets.
    Packets,
}

/// Scheduling discipline applied to a port or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    Strict,
    #[default]
    WeightedRoundRobin,
    WeightedDeficitRoundRobin,
}

/// Complete scheduler programming for one port or queue. `None` restores the
/// SDK default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    pub mode: ScheduleMode,
    pub weight: u8,
    pub unit: ShaperUnit,
    pub min_rate: u32,
    pub min_burst: u32,
    pub max_rate: u32,
    pub max_burst: u32,
}

/// Queue selector within a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSelector {
    pub port: u32,
    pub index: u32,
    pub multicast: bool,
}

/// Buffer pool programming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    pub ingress: bool,
    pub size: u32,
    pub dynamic_threshold: bool,
}

/// Shared-buffer limit of an ingress priority group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedLimit {
    /// Alpha exponent of the free pool space.
    Dynamic(i8),
    /// Bytes.
    Static(u32),
}

/// Ingress priority-group buffer programming. Sizes are bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressPgConfig {
    pub pool: u32,
    pub min: u32,
    pub shared: SharedLimit,
    pub xoff: u32,
    pub xon: u32,
}

/// Switch-wide controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchControl {
    EcmpHashSeed,
    /// 1 selects the XOR hash, 8 the CRC hash.
    EcmpHashConfig,
}

/// Port counters the SDK can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortCounter {
    InOctets,
    InUnicastPackets,
    InNonUnicastPackets,
    InDiscards,
    InErrors,
    OutOctets,
    OutUnicastPackets,
    OutNonUnicastPackets,
    OutDiscards,
    OutErrors,
}

/// L2 table notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2Operation {
    Add,
    Delete,
    Move,
    Report,
}

/// Asynchronous events raised by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    LinkStatus { port: u32, up: bool },
    L2Addr { addr: L2Addr, operation: L2Operation },
    Switch { event: u32, args: [u32; 3] },
}

impl fmt::Display for SdkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkEvent::LinkStatus { port, up } => {
                write!(f, "link {} on port {}", if *up { "up" } else { "down" }, port)
            }
            SdkEvent::L2Addr { addr, operation } => {
                write!(f, "l2 {:?} {} vlan {} port {}", operation, addr.mac, addr.vlan, addr.port)
            }
            SdkEvent::Switch { event, args } => write!(
                f,
                "switch event {} ({:x} {:x} {:x})",
                event, args[0], args[1], args[2]
            ),
        }
    }
}

/// Receiver for [`SdkEvent`]s. Called from SDK-owned threads.
pub trait SdkEventHandler: Send + Sync {
    fn on_event(&self, event: SdkEvent);
}

/// Operations the shim needs from the switch-ASIC SDK.
///
/// Ids returned by `*_create` methods are SDK-assigned and opaque to callers
/// other than being passed back to the matching destroy call.
pub trait SwitchSdk: Send + Sync {
    // Lifecycle
    fn attach(&self, hardware_id: &str, config_file: Option<&str>) -> SdkResult<()>;
    fn detach(&self) -> SdkResult<()>;
    fn capabilities(&self) -> SdkResult<SdkCapabilities>;
    fn register_event_handler(&self, handler: Arc<dyn SdkEventHandler>) -> SdkResult<()>;
    fn unregister_event_handler(&self) -> SdkResult<()>;

    // Switch
    fn switch_control_set(&self, control: SwitchControl, value: u32) -> SdkResult<()>;
    fn l2_age_timer_set(&self, seconds: u32) -> SdkResult<()>;

    // Port
    fn port_enable_set(&self, port: u32, enable: bool) -> SdkResult<()>;
    fn port_enable_get(&self, port: u32) -> SdkResult<bool>;
    fn port_link_status_get(&self, port: u32) -> SdkResult<bool>;
    fn port_speed_get(&self, port: u32) -> SdkResult<u32>;
    fn port_untagged_vlan_set(&self, port: u32, vlan: u16) -> SdkResult<()>;
    fn port_untagged_vlan_get(&self, port: u32) -> SdkResult<u16>;
    fn port_stat_get(&self, port: u32, counter: PortCounter) -> SdkResult<u64>;

    // QoS
    fn port_scheduler_set(&self, port: u32, config: Option<&SchedulerConfig>) -> SdkResult<()>;
    fn queue_scheduler_set(
        &self,
        queue: QueueSelector,
        config: Option<&SchedulerConfig>,
    ) -> SdkResult<()>;
    fn buffer_pool_set(&self, pool: u32, config: Option<&BufferPoolConfig>) -> SdkResult<()>;
    fn ingress_pg_set(&self, port: u32, pg: u32, config: Option<&IngressPgConfig>) -> SdkResult<()>;

    // VLAN
    fn vlan_create(&self, vlan: u16) -> SdkResult<()>;
    fn vlan_destroy(&self, vlan: u16) -> SdkResult<()>;
    fn vlan_destroy_all(&self) -> SdkResult<()>;
    fn vlan_default_get(&self) -> SdkResult<u16>;
    fn vlan_port_add(&self, vlan: u16, ports: &[u32], untagged: &[u32]) -> SdkResult<()>;
    fn vlan_port_remove(&self, vlan: u16, ports: &[u32]) -> SdkResult<()>;

    // L2
    fn l2_addr_add(&self, addr: &L2Addr) -> SdkResult<()>;
    fn l2_addr_delete(&self, mac: MacAddress, vlan: u16) -> SdkResult<()>;
    fn l2_addr_get(&self, mac: MacAddress, vlan: u16) -> SdkResult<L2Addr>;
    fn l2_station_add(&self, station: &L2Station) -> SdkResult<u32>;
    fn l2_station_delete(&self, station_id: u32) -> SdkResult<()>;

    // L3
    fn l3_intf_create(&self, intf: &L3Intf) -> SdkResult<u32>;
    fn l3_intf_delete(&self, intf_id: u32) -> SdkResult<()>;
    fn l3_egress_create(&self, egress: &L3Egress) -> SdkResult<u32>;
    fn l3_egress_destroy(&self, egress_id: u32) -> SdkResult<()>;
    fn l3_route_add(&self, route: &L3Route) -> SdkResult<()>;
    fn l3_route_delete(&self, route: &L3Route) -> SdkResult<()>;
    fn l3_ecmp_create(&self, members: &[u32]) -> SdkResult<u32>;
    fn l3_ecmp_destroy(&self, ecmp_id: u32) -> SdkResult<()>;
    fn l3_ecmp_add(&self, ecmp_id: u32, member: u32) -> SdkResult<()>;
    fn l3_ecmp_delete(&self, ecmp_id: u32, member: u32) -> SdkResult<()>;
    fn l3_ecmp_get(&self, ecmp_id: u32) -> SdkResult<Vec<u32>>;
}
