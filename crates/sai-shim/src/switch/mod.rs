//! The switch object: lifecycle and the per-switch context.
//!
//! A [`SaiSwitch`] is `UNINITIALIZED` until [`SaiSwitch::initialize`] brings
//! the SDK up and builds a [`SwitchContext`]. Every domain call (see
//! [`crate::api`]) borrows that context and fails with
//! [`SaiError::Uninitialized`] when there is none. [`SaiSwitch::shutdown`]
//! drops it again.
//!
//! Configuration calls take `&mut self`; hosts that call from several threads
//! wrap the switch in a `Mutex`. Only the notification slot is shared with the
//! SDK's event threads.

pub mod attrs;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use sai_types::MacAddress;

use crate::api::buffer::{BufferPoolRecord, BufferProfileRecord};
use crate::api::neighbor::NeighborRecord;
use crate::api::next_hop::NextHopRecord;
use crate::api::router_interface::RouterInterfaceRecord;
use crate::api::scheduler::SchedulerRecord;
use crate::api::virtual_router::VirtualRouterRecord;
use crate::api::vlan::VlanBitmap;
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::notify::{EventForwarder, NotificationSlot, SwitchNotifications};
use crate::profile::{BootType, SwitchProfile};
use crate::sdk::{SdkCapabilities, SwitchSdk};
use crate::table::ResourceTable;

use self::attrs::SwitchAttrState;

/// Scheduler profiles kept by the shim.
pub const MAX_SCHEDULERS: u32 = 128;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Uninitialized,
    /// Initialized with no host callbacks attached.
    Initialized,
    /// Initialized and delivering notifications to the host.
    Connected,
}

/// Everything the shim owns while the switch is up.
#[derive(Debug)]
pub struct SwitchContext {
    /// Sizes and port layout reported by the SDK.
    pub(crate) capabilities: SdkCapabilities,
    pub(crate) profile: SwitchProfile,
    pub(crate) queues_per_port: u32,
    /// Default source MAC for virtual routers.
    pub(crate) system_mac: MacAddress,
    pub(crate) default_vlan: u16,
    pub(crate) vlans: VlanBitmap,
    pub(crate) virtual_routers: ResourceTable<VirtualRouterRecord>,
    /// Indexed by SDK L3 interface id.
    pub(crate) router_interfaces: ResourceTable<RouterInterfaceRecord>,
    pub(crate) schedulers: ResourceTable<SchedulerRecord>,
    pub(crate) buffer_pools: ResourceTable<BufferPoolRecord>,
    pub(crate) buffer_profiles: ResourceTable<BufferProfileRecord>,
    /// Port or queue handle → scheduler id currently bound to it.
    pub(crate) scheduler_bindings: HashMap<Handle, u32>,
    /// Ingress priority-group handle → bound buffer profile id.
    pub(crate) priority_group_profiles: HashMap<Handle, u32>,
    /// Keyed by (SDK L3 interface id, neighbor address).
    pub(crate) neighbors: HashMap<(u32, IpAddr), NeighborRecord>,
    /// Keyed by SDK egress id.
    pub(crate) next_hops: HashMap<u32, NextHopRecord>,
    pub(crate) switch_attrs: SwitchAttrState,
}

impl SwitchContext {
    fn new(capabilities: SdkCapabilities, profile: SwitchProfile, default_vlan: u16) -> Self {
        let queues_per_port = profile.queues_per_port_or(capabilities.queues_per_port);
        let system_mac = profile.switch_mac.unwrap_or_default();
        Self {
            virtual_routers: ResourceTable::new("virtual router", capabilities.max_vrf),
            router_interfaces: ResourceTable::new("router interface", capabilities.max_l3_intf),
            schedulers: ResourceTable::new("scheduler", MAX_SCHEDULERS),
            buffer_pools: ResourceTable::new("buffer pool", capabilities.max_buffer_pools),
            buffer_profiles: ResourceTable::new(
                "buffer profile",
                capabilities.max_buffer_profiles,
            ),
            vlans: VlanBitmap::new(default_vlan),
            scheduler_bindings: HashMap::new(),
            priority_group_profiles: HashMap::new(),
            neighbors: HashMap::new(),
            next_hops: HashMap::new(),
            switch_attrs: SwitchAttrState::default(),
            capabilities,
            profile,
            queues_per_port,
            system_mac,
            default_vlan,
        }
    }

    pub fn capabilities(&self) -> &SdkCapabilities {
        &self.capabilities
    }

    pub fn profile(&self) -> &SwitchProfile {
        &self.profile
    }

    pub fn system_mac(&self) -> MacAddress {
        self.system_mac
    }

    pub fn queues_per_port(&self) -> u32 {
        self.queues_per_port
    }

    pub fn has_port(&self, port: u32) -> bool {
        self.capabilities.ports.contains(&port)
    }

    /// Fails with `InvalidPortNumber` for ports the SDK did not report.
    pub(crate) fn check_port(&self, port: u32) -> SaiResult<()> {
        if self.has_port(port) {
            Ok(())
        } else {
            Err(SaiError::InvalidPortNumber { port })
        }
    }

    /// Port number carried by a port handle.
    pub(crate) fn port_from_handle(&self, handle: Handle) -> SaiResult<u32> {
        let port = expect_type(handle, ObjectType::Port)?;
        self.check_port(port)?;
        Ok(port)
    }

    /// Occupied VRF record, or `InvalidParameter`.
    pub(crate) fn check_vrf(&self, vrf_id: u32) -> SaiResult<&VirtualRouterRecord> {
        self.virtual_routers
            .get(vrf_id)
            .map_err(|_| SaiError::invalid_parameter(format!("invalid virtual router {}", vrf_id)))
    }
}

/// Value of `handle` when it has type `expected`.
pub(crate) fn expect_type(handle: Handle, expected: ObjectType) -> SaiResult<u32> {
    if handle.decode_type() == expected {
        Ok(handle.decode_value::<u32>())
    } else {
        Err(SaiError::InvalidObjectType { expected, handle })
    }
}

/// A switch driven through `S`.
pub struct SaiSwitch<S: SwitchSdk> {
    sdk: Arc<S>,
    context: Option<SwitchContext>,
    notifications: NotificationSlot,
}

impl<S: SwitchSdk> std::fmt::Debug for SaiSwitch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaiSwitch")
            .field("state", &self.state())
            .field("context", &self.context)
            .finish()
    }
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn new(sdk: Arc<S>) -> Self {
        Self {
            sdk,
            context: None,
            notifications: NotificationSlot::default(),
        }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn state(&self) -> SwitchState {
        match (&self.context, self.notifications.is_set()) {
            (None, _) => SwitchState::Uninitialized,
            (Some(_), false) => SwitchState::Initialized,
            (Some(_), true) => SwitchState::Connected,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Context of an initialized switch.
    pub fn context(&self) -> SaiResult<&SwitchContext> {
        self.context.as_ref().ok_or(SaiError::Uninitialized)
    }

    /// SDK and mutable context, borrowed together.
    pub(crate) fn parts_mut(&mut self) -> SaiResult<(&S, &mut SwitchContext)> {
        let context = self.context.as_mut().ok_or(SaiError::Uninitialized)?;
        Ok((&*self.sdk, context))
    }

    /// Brings up the SDK, sizes the tables and registers for SDK events.
    pub fn initialize(
        &mut self,
        hardware_id: &str,
        profile: SwitchProfile,
        notifications: Arc<dyn SwitchNotifications>,
    ) -> SaiResult<()> {
        if hardware_id.is_empty() {
            return Err(SaiError::invalid_parameter("empty switch hardware id"));
        }
        if self.context.is_some() {
            error_log!(SaiApi::Switch, hardware_id, "switch already initialized");
            return Err(SaiError::AlreadyInitialized);
        }
        profile
            .validate()
            .map_err(|e| SaiError::invalid_parameter(e.to_string()))?;
        info_log!(SaiApi::Switch, hardware_id, "switch init request");
        if profile.boot_type != BootType::Cold {
            warn_log!(
                SaiApi::Switch,
                boot_type = ?profile.boot_type,
                "only cold boot is supported, continuing with cold boot"
            );
        }
        for (key, value) in &profile.extra {
            debug_log!(SaiApi::Switch, key = %key, value = %value, "unrecognized profile key");
        }

        self.sdk
            .attach(hardware_id, profile.init_config_file.as_deref())
            .map_err(|e| {
                error_log!(SaiApi::Switch, error = %e, "SDK attach failed");
                SaiError::sdk("attach")(e)
            })?;

        let context = match self.bring_up(profile) {
            Ok(context) => context,
            Err(e) => {
                error_log!(SaiApi::Switch, error = %e, "switch bring-up failed");
                if let Err(detach) = self.sdk.detach() {
                    warn_log!(SaiApi::Switch, error = %detach, "SDK detach after failed init");
                }
                return Err(e);
            }
        };

        info_log!(
            SaiApi::Switch,
            ports = context.capabilities.ports.len(),
            max_vrf = context.capabilities.max_vrf,
            max_l3_intf = context.capabilities.max_l3_intf,
            queues_per_port = context.queues_per_port,
            "switch initialized"
        );
        self.notifications.set(notifications);
        self.context = Some(context);
        Ok(())
    }

    fn bring_up(&self, profile: SwitchProfile) -> SaiResult<SwitchContext> {
        let capabilities = self
            .sdk
            .capabilities()
            .map_err(SaiError::sdk("capabilities"))?;
        let default_vlan = self
            .sdk
            .vlan_default_get()
            .map_err(SaiError::sdk("vlan_default_get"))?;
        self.sdk
            .vlan_port_add(default_vlan, &capabilities.ports, &capabilities.ports)
            .map_err(SaiError::sdk("vlan_port_add"))?;

        let forwarder = Arc::new(EventForwarder::new(self.notifications.clone()));
        self.sdk
            .register_event_handler(forwarder)
            .map_err(SaiError::sdk("register_event_handler"))?;

        Ok(SwitchContext::new(capabilities, profile, default_vlan))
    }

    /// Attaches host callbacks to an already initialized switch. A second
    /// connect replaces the callbacks.
    pub fn connect(
        &mut self,
        hardware_id: &str,
        notifications: Arc<dyn SwitchNotifications>,
    ) -> SaiResult<()> {
        self.context()?;
        if hardware_id.is_empty() {
            return Err(SaiError::invalid_parameter("empty switch hardware id"));
        }
        info_log!(SaiApi::Switch, hardware_id, "switch connect request");
        self.notifications.set(notifications);
        Ok(())
    }

    /// Detaches host callbacks. SDK events are dropped from here on.
    pub fn disconnect(&mut self) {
        info_log!(SaiApi::Switch, "switch disconnect");
        self.notifications.clear();
    }

    /// Releases all shim state and detaches from the SDK.
    pub fn shutdown(&mut self, warm_restart_hint: bool) -> SaiResult<()> {
        let context = self.context.take().ok_or(SaiError::Uninitialized)?;
        self.notifications.clear();

        if let Err(e) = self.sdk.unregister_event_handler() {
            warn_log!(SaiApi::Switch, error = %e, "SDK event unregister failed");
        }
        let result = self.sdk.detach().map_err(SaiError::sdk("detach"));

        info_log!(
            SaiApi::Switch,
            warm_restart_hint,
            virtual_routers = context.virtual_routers.count(),
            router_interfaces = context.router_interfaces.count(),
            schedulers = context.schedulers.count(),
            "switch shut down"
        );
        result
    }

    /// Reports whether the shim implements `api`.
    pub fn api_query(&self, api: SaiApi) -> SaiResult<()> {
        match api {
            SaiApi::Switch
            | SaiApi::Port
            | SaiApi::Fdb
            | SaiApi::Vlan
            | SaiApi::VirtualRouter
            | SaiApi::Route
            | SaiApi::NextHop
            | SaiApi::NextHopGroup
            | SaiApi::Neighbor
            | SaiApi::RouterInterface
            | SaiApi::Queue
            | SaiApi::Scheduler
            | SaiApi::Buffers => Ok(()),
            other => Err(SaiError::not_implemented(other.to_string())),
        }
    }

    /// Object type encoded in `handle`; `Null` for unknown tags.
    pub fn object_type_query(&self, handle: Handle) -> ObjectType {
        handle.decode_type()
    }

    pub fn log_set(&self, api: SaiApi, level: crate::logging::SaiLogLevel) {
        crate::logging::log_set(api, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaiStatus;
    use crate::sdk::sim::{SdkCall, SimulatedSdk};
    use crate::sdk::{SdkError, SdkEvent};
    use crate::notify::{PortOperStatus, PortOperStatusNotification};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Host {
        ports: Mutex<Vec<PortOperStatusNotification>>,
    }

    impl SwitchNotifications for Host {
        fn on_port_state_change(&self, changes: &[PortOperStatusNotification]) {
            self.ports.lock().unwrap().extend_from_slice(changes);
        }
    }

    fn switch() -> SaiSwitch<SimulatedSdk> {
        SaiSwitch::new(Arc::new(SimulatedSdk::default()))
    }

    #[test]
    fn test_lifecycle() {
        let mut sw = switch();
        assert_eq!(sw.state(), SwitchState::Uninitialized);

        sw.initialize("unit0", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap();
        assert_eq!(sw.state(), SwitchState::Connected);
        assert!(sw.sdk().has_event_handler());

        sw.disconnect();
        assert_eq!(sw.state(), SwitchState::Initialized);

        sw.connect("unit0", Arc::new(Host::default())).unwrap();
        assert_eq!(sw.state(), SwitchState::Connected);

        sw.shutdown(false).unwrap();
        assert_eq!(sw.state(), SwitchState::Uninitialized);
        assert!(!sw.sdk().is_attached());
        assert_eq!(sw.sdk().calls().last(), Some(&SdkCall::Detach));
    }

    #[test]
    fn test_double_initialize_is_failure() {
        let mut sw = switch();
        sw.initialize("unit0", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap();
        let err = sw
            .initialize("unit0", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap_err();
        assert_eq!(err, SaiError::AlreadyInitialized);
        assert_eq!(err.status(), SaiStatus::Failure);
    }

    #[test]
    fn test_calls_before_init() {
        let mut sw = switch();
        assert_eq!(
            sw.connect("unit0", Arc::new(Host::default())).unwrap_err(),
            SaiError::Uninitialized
        );
        assert_eq!(sw.shutdown(false).unwrap_err(), SaiError::Uninitialized);
        assert_eq!(sw.context().unwrap_err().status(), SaiStatus::Uninitialized);
    }

    #[test]
    fn test_failed_bring_up_detaches() {
        let mut sw = switch();
        sw.sdk().fail_next("capabilities", SdkError::Internal);
        let err = sw
            .initialize("unit0", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::Failure);
        assert!(!sw.sdk().is_attached());
        assert_eq!(sw.state(), SwitchState::Uninitialized);

        // Retry succeeds from a clean slate.
        sw.initialize("unit0", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap();
    }

    #[test]
    fn test_link_events_reach_host() {
        let mut sw = switch();
        let host = Arc::new(Host::default());
        sw.initialize("unit0", SwitchProfile::default(), host.clone())
            .unwrap();

        sw.sdk().set_link(3, true);
        sw.disconnect();
        sw.sdk().raise_event(SdkEvent::LinkStatus { port: 3, up: false });

        let seen = host.ports.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].port_id, Handle::encode(ObjectType::Port, 3));
        assert_eq!(seen[0].port_state, PortOperStatus::Up);
    }

    #[test]
    fn test_profile_sizes_context() {
        let mut sw = switch();
        let profile = SwitchProfile::from_kvps([
            ("SAI_SWITCH_MAC", "02:00:00:00:00:aa"),
            ("SAI_NUM_QUEUES_PER_PORT", "4"),
        ])
        .unwrap();
        sw.initialize("unit0", profile, Arc::new(Host::default()))
            .unwrap();

        let ctx = sw.context().unwrap();
        assert_eq!(ctx.queues_per_port(), 4);
        assert_eq!(ctx.system_mac().to_string(), "02:00:00:00:00:aa");
        assert_eq!(ctx.virtual_routers.max(), 16);
        assert_eq!(ctx.schedulers.max(), MAX_SCHEDULERS);
        assert!(ctx.vlans.contains(1));
    }

    #[test]
    fn test_oversized_queue_count_rejected() {
        let mut sw = switch();
        let profile = SwitchProfile {
            queues_per_port: Some(u32::MAX),
            ..SwitchProfile::default()
        };
        let err = sw
            .initialize("unit0", profile, Arc::new(Host::default()))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidParameter);
        assert!(!sw.sdk().is_attached());
    }

    #[test]
    fn test_api_query() {
        let sw = switch();
        assert!(sw.api_query(SaiApi::Scheduler).is_ok());
        assert_eq!(
            sw.api_query(SaiApi::Acl).unwrap_err().status(),
            SaiStatus::NotImplemented
        );
        assert!(sw.api_query(SaiApi::NextHop).is_ok());
        assert!(sw.api_query(SaiApi::Neighbor).is_ok());
        assert_eq!(
            sw.api_query(SaiApi::Wred).unwrap_err().status(),
            SaiStatus::NotImplemented
        );
    }

    #[test]
    fn test_object_type_query() {
        let sw = switch();
        let vlan_rif = Handle::encode(ObjectType::RouterInterface, 5);
        assert_eq!(sw.object_type_query(vlan_rif), ObjectType::RouterInterface);
        assert_eq!(sw.object_type_query(Handle::from_raw(0xEE_0000_0001)), ObjectType::Null);
    }

    #[test]
    fn test_empty_hardware_id() {
        let mut sw = switch();
        let err = sw
            .initialize("", SwitchProfile::default(), Arc::new(Host::default()))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::InvalidParameter);
    }
}
