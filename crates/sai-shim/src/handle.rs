//! Opaque 64-bit SAI object handles.
//!
//! Every object this shim hands out is identified by a [`Handle`] that packs
//! four fields into a `u64`:
//!
//! | bits  | field     | meaning                                        |
//! |-------|-----------|------------------------------------------------|
//! | 0-31  | `value`   | SDK resource index or table slot                |
//! | 32-39 | `type`    | [`ObjectType`] tag                              |
//! | 40-47 | `subtype` | secondary discriminator (e.g. [`QueueType`])   |
//! | 48-63 | `map`     | indirection index (the owning port for queues) |
//!
//! Encoding never validates; callers check the value against the owning
//! table first. Decoding is total.

use std::fmt;

/// Raw SAI object ID (matches `sai_object_id_t`).
pub type RawSaiObjectId = u64;

const VALUE_MASK: u64 = 0xffff_ffff;
const TYPE_SHIFT: u32 = 32;
const SUBTYPE_SHIFT: u32 = 40;
const MAP_SHIFT: u32 = 48;

/// SAI object categories carried in the handle's type field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Null = 0,
    Port = 1,
    Lag = 2,
    VirtualRouter = 3,
    NextHop = 4,
    NextHopGroup = 5,
    RouterInterface = 6,
    AclTable = 7,
    AclEntry = 8,
    AclCounter = 9,
    HostInterface = 10,
    Mirror = 11,
    SamplePacket = 12,
    StpInstance = 13,
    TrapGroup = 14,
    Policer = 15,
    Wred = 16,
    QosMaps = 17,
    Queue = 18,
    Scheduler = 19,
    SchedulerGroup = 20,
    BufferPool = 21,
    BufferProfile = 22,
    PriorityGroup = 23,
    LagMember = 24,
}

impl ObjectType {
    const ALL: [ObjectType; 25] = [
        ObjectType::Null,
        ObjectType::Port,
        ObjectType::Lag,
        ObjectType::VirtualRouter,
        ObjectType::NextHop,
        ObjectType::NextHopGroup,
        ObjectType::RouterInterface,
        ObjectType::AclTable,
        ObjectType::AclEntry,
        ObjectType::AclCounter,
        ObjectType::HostInterface,
        ObjectType::Mirror,
        ObjectType::SamplePacket,
        ObjectType::StpInstance,
        ObjectType::TrapGroup,
        ObjectType::Policer,
        ObjectType::Wred,
        ObjectType::QosMaps,
        ObjectType::Queue,
        ObjectType::Scheduler,
        ObjectType::SchedulerGroup,
        ObjectType::BufferPool,
        ObjectType::BufferProfile,
        ObjectType::PriorityGroup,
        ObjectType::LagMember,
    ];

    /// Maps a raw tag back to the enumeration. Unknown tags yield `None`.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw)).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Null => "NULL",
            ObjectType::Port => "PORT",
            ObjectType::Lag => "LAG",
            ObjectType::VirtualRouter => "VIRTUAL_ROUTER",
            ObjectType::NextHop => "NEXT_HOP",
            ObjectType::NextHopGroup => "NEXT_HOP_GROUP",
            ObjectType::RouterInterface => "ROUTER_INTERFACE",
            ObjectType::AclTable => "ACL_TABLE",
            ObjectType::AclEntry => "ACL_ENTRY",
            ObjectType::AclCounter => "ACL_COUNTER",
            ObjectType::HostInterface => "HOST_INTERFACE",
            ObjectType::Mirror => "MIRROR",
            ObjectType::SamplePacket => "SAMPLEPACKET",
            ObjectType::StpInstance => "STP_INSTANCE",
            ObjectType::TrapGroup => "TRAP_GROUP",
            ObjectType::Policer => "POLICER",
            ObjectType::Wred => "WRED",
            ObjectType::QosMaps => "QOS_MAPS",
            ObjectType::Queue => "QUEUE",
            ObjectType::Scheduler => "SCHEDULER",
            ObjectType::SchedulerGroup => "SCHEDULER_GROUP",
            ObjectType::BufferPool => "BUFFER_POOL",
            ObjectType::BufferProfile => "BUFFER_PROFILE",
            ObjectType::PriorityGroup => "PRIORITY_GROUP",
            ObjectType::LagMember => "LAG_MEMBER",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SAI_OBJECT_TYPE_{}", self.name())
    }
}

/// Queue kind, carried in the subtype field of queue handles.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    All = 0,
    Unicast = 1,
    Multicast = 2,
}

impl QueueType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(QueueType::All),
            1 => Some(QueueType::Unicast),
            2 => Some(QueueType::Multicast),
            _ => None,
        }
    }
}

/// Integer widths a handle's value field may be decoded into.
///
/// Decoding keeps the low bits of the handle and reinterprets them, exactly
/// like a C cast: values wider than the target are truncated without error.
pub trait HandleValue: Copy {
    fn truncate_from(raw: RawSaiObjectId) -> Self;
}

macro_rules! impl_handle_value {
    ($($ty:ty),*) => {
        $(
            impl HandleValue for $ty {
                #[inline]
                fn truncate_from(raw: RawSaiObjectId) -> Self {
                    raw as $ty
                }
            }
        )*
    };
}

impl_handle_value!(u8, u16, u32, i8, i16, i32);

/// An opaque SAI object handle.
///
/// ```
/// use sai_shim::handle::{Handle, ObjectType};
///
/// let h = Handle::encode(ObjectType::VirtualRouter, 3);
/// assert_eq!(h.decode_type(), ObjectType::VirtualRouter);
/// assert_eq!(h.decode_value::<u32>(), 3);
/// assert_eq!(h.as_raw(), 0x0000_0003_0000_0003);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Handle(RawSaiObjectId);

impl Handle {
    /// `SAI_NULL_OBJECT_ID`.
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: RawSaiObjectId) -> Self {
        Handle(raw)
    }

    pub const fn as_raw(&self) -> RawSaiObjectId {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub const fn encode(object_type: ObjectType, value: u32) -> Self {
        Handle(((object_type as u64) << TYPE_SHIFT) | value as u64)
    }

    pub const fn encode_with_subtype(object_type: ObjectType, subtype: u8, value: u32) -> Self {
        Handle(Self::encode(object_type, value).0 | ((subtype as u64) << SUBTYPE_SHIFT))
    }

    pub const fn encode_with_map(
        object_type: ObjectType,
        subtype: u8,
        map: u16,
        value: u32,
    ) -> Self {
        Handle(
            Self::encode_with_subtype(object_type, subtype, value).0 | ((map as u64) << MAP_SHIFT),
        )
    }

    /// Raw contents of the type field.
    pub const fn raw_type(&self) -> u8 {
        (self.0 >> TYPE_SHIFT) as u8
    }

    /// Type field as an [`ObjectType`]; tags outside the enumeration read as
    /// [`ObjectType::Null`].
    pub fn decode_type(&self) -> ObjectType {
        ObjectType::from_raw(self.raw_type()).unwrap_or(ObjectType::Null)
    }

    pub const fn decode_subtype(&self) -> u8 {
        (self.0 >> SUBTYPE_SHIFT) as u8
    }

    pub const fn decode_map(&self) -> u16 {
        (self.0 >> MAP_SHIFT) as u16
    }

    /// Value field reinterpreted as `T`. No range check is made.
    pub fn decode_value<T: HandleValue>(&self) -> T {
        T::truncate_from(self.0)
    }

    /// Full 32-bit value field.
    pub const fn index(&self) -> u32 {
        (self.0 & VALUE_MASK) as u32
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:016x})", self.decode_type().name(), self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<RawSaiObjectId> for Handle {
    fn from(raw: RawSaiObjectId) -> Self {
        Handle(raw)
    }
}

impl From<Handle> for RawSaiObjectId {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}
