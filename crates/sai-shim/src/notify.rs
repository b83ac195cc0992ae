//! Host notifications and SDK event translation.
//!
//! The SDK raises link, L2 and switch events on its own threads. The
//! [`EventForwarder`] registered at switch init turns them into the SAI
//! notification shapes below and hands them to whatever
//! [`SwitchNotifications`] the host attached with `connect`. Events arriving
//! while nothing is attached are dropped.

use std::sync::{Arc, RwLock};

use crate::api::fdb::{FdbEntry, FdbEntryAttr};
use crate::attr::{Attribute, AttributeValue};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{L2Addr, L2Operation, SdkEvent, SdkEventHandler};

/// Operational state reported for a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortOperStatus {
    #[default]
    Unknown,
    Up,
    Down,
    Testing,
    NotPresent,
}

/// Operational state reported for the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOperStatus {
    Unknown,
    Up,
    Down,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOperStatusNotification {
    pub port_id: Handle,
    pub port_state: PortOperStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdbEventType {
    Learned,
    Aged,
    Flushed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdbEventNotification {
    pub event_type: FdbEventType,
    pub fdb_entry: FdbEntry,
    pub attrs: Vec<Attribute<FdbEntryAttr>>,
}

/// Callbacks supplied by the host. All default to no-ops.
pub trait SwitchNotifications: Send + Sync {
    fn on_switch_state_change(&self, _status: SwitchOperStatus) {}

    fn on_fdb_event(&self, _events: &[FdbEventNotification]) {}

    fn on_port_state_change(&self, _changes: &[PortOperStatusNotification]) {}

    fn on_switch_shutdown_request(&self) {}
}

/// Host callback slot shared between the switch and SDK event threads.
#[derive(Clone, Default)]
pub struct NotificationSlot {
    inner: Arc<RwLock<Option<Arc<dyn SwitchNotifications>>>>,
}

impl NotificationSlot {
    pub fn set(&self, notifications: Arc<dyn SwitchNotifications>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(notifications);
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn get(&self) -> Option<Arc<dyn SwitchNotifications>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for NotificationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSlot")
            .field("connected", &self.is_set())
            .finish()
    }
}

/// Link change → port oper-status notification.
pub fn port_state_notification(port: u32, up: bool) -> PortOperStatusNotification {
    PortOperStatusNotification {
        port_id: Handle::encode(ObjectType::Port, port),
        port_state: if up {
            PortOperStatus::Up
        } else {
            PortOperStatus::Down
        },
    }
}

/// L2 add/delete → learned/aged notification. Other operations map to `None`.
pub fn fdb_notification(addr: &L2Addr, operation: L2Operation) -> Option<FdbEventNotification> {
    let event_type = match operation {
        L2Operation::Add => FdbEventType::Learned,
        L2Operation::Delete => FdbEventType::Aged,
        L2Operation::Move | L2Operation::Report => return None,
    };
    Some(FdbEventNotification {
        event_type,
        fdb_entry: FdbEntry {
            mac: addr.mac,
            vlan: addr.vlan,
        },
        attrs: vec![Attribute::new(
            FdbEntryAttr::PortId,
            AttributeValue::Oid(Handle::encode(ObjectType::Port, addr.port)),
        )],
    })
}

/// [`SdkEventHandler`] that forwards into the host's notification slot.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    slot: NotificationSlot,
}

impl EventForwarder {
    pub fn new(slot: NotificationSlot) -> Self {
        Self { slot }
    }
}

impl SdkEventHandler for EventForwarder {
    fn on_event(&self, event: SdkEvent) {
        match event {
            SdkEvent::LinkStatus { port, up } => {
                debug_log!(SaiApi::Port, port, up, "link event");
                if let Some(host) = self.slot.get() {
                    host.on_port_state_change(&[port_state_notification(port, up)]);
                }
            }
            SdkEvent::L2Addr { addr, operation } => {
                let Some(notification) = fdb_notification(&addr, operation) else {
                    debug_log!(SaiApi::Fdb, op = ?operation, mac = %addr.mac, "ignored L2 event");
                    return;
                };
                debug_log!(
                    SaiApi::Fdb,
                    event = ?notification.event_type,
                    mac = %addr.mac,
                    vlan = addr.vlan,
                    port = addr.port,
                    "FDB event"
                );
                if let Some(host) = self.slot.get() {
                    host.on_fdb_event(&[notification]);
                }
            }
            SdkEvent::Switch { event, args } => {
                error_log!(
                    SaiApi::Switch,
                    event,
                    arg1 = args[0],
                    arg2 = args[1],
                    arg3 = args[2],
                    "received switch event"
                );
            }
        }
    }
}
