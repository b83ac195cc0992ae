//! Structured logging with per-API SAI log levels.
//!
//! Events go through `tracing`; the `*_log!` macros tag every event with the
//! SAI API it belongs to and drop it early when that API's level (set with
//! [`log_set`]) is above the event's severity. The subscriber decides the rest.
//!
//! ```ignore
//! info_log!(SaiApi::Vlan, vlan = 100, "VLAN created");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// SAI API families, numbered like `sai_api_t`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SaiApi {
    Unspecified = 0,
    Switch = 1,
    Port = 2,
    Fdb = 3,
    Vlan = 4,
    VirtualRouter = 5,
    Route = 6,
    NextHop = 7,
    NextHopGroup = 8,
    RouterInterface = 9,
    Neighbor = 10,
    Acl = 11,
    HostInterface = 12,
    Mirror = 13,
    SamplePacket = 14,
    Stp = 15,
    Lag = 16,
    Policer = 17,
    Wred = 18,
    QosMaps = 19,
    Queue = 20,
    Scheduler = 21,
    SchedulerGroup = 22,
    Buffers = 23,
}

impl SaiApi {
    pub const COUNT: usize = 24;

    pub const ALL: [SaiApi; Self::COUNT] = [
        SaiApi::Unspecified,
        SaiApi::Switch,
        SaiApi::Port,
        SaiApi::Fdb,
        SaiApi::Vlan,
        SaiApi::VirtualRouter,
        SaiApi::Route,
        SaiApi::NextHop,
        SaiApi::NextHopGroup,
        SaiApi::RouterInterface,
        SaiApi::Neighbor,
        SaiApi::Acl,
        SaiApi::HostInterface,
        SaiApi::Mirror,
        SaiApi::SamplePacket,
        SaiApi::Stp,
        SaiApi::Lag,
        SaiApi::Policer,
        SaiApi::Wred,
        SaiApi::QosMaps,
        SaiApi::Queue,
        SaiApi::Scheduler,
        SaiApi::SchedulerGroup,
        SaiApi::Buffers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SaiApi::Unspecified => "UNSPECIFIED",
            SaiApi::Switch => "SWITCH",
            SaiApi::Port => "PORT",
            SaiApi::Fdb => "FDB",
            SaiApi::Vlan => "VLAN",
            SaiApi::VirtualRouter => "VIRTUAL_ROUTER",
            SaiApi::Route => "ROUTE",
            SaiApi::NextHop => "NEXT_HOP",
            SaiApi::NextHopGroup => "NEXT_HOP_GROUP",
            SaiApi::RouterInterface => "ROUTER_INTERFACE",
            SaiApi::Neighbor => "NEIGHBOR",
            SaiApi::Acl => "ACL",
            SaiApi::HostInterface => "HOST_INTERFACE",
            SaiApi::Mirror => "MIRROR",
            SaiApi::SamplePacket => "SAMPLEPACKET",
            SaiApi::Stp => "STP",
            SaiApi::Lag => "LAG",
            SaiApi::Policer => "POLICER",
            SaiApi::Wred => "WRED",
            SaiApi::QosMaps => "QOS_MAPS",
            SaiApi::Queue => "QUEUE",
            SaiApi::Scheduler => "SCHEDULER",
            SaiApi::SchedulerGroup => "SCHEDULER_GROUP",
            SaiApi::Buffers => "BUFFERS",
        }
    }
}

impl fmt::Display for SaiApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SAI_API_{}", self.name())
    }
}

/// SAI log severities, lowest first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SaiLogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Notice = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
}

impl SaiLogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SaiLogLevel::Debug,
            1 => SaiLogLevel::Info,
            2 => SaiLogLevel::Notice,
            3 => SaiLogLevel::Warn,
            4 => SaiLogLevel::Error,
            _ => SaiLogLevel::Critical,
        }
    }
}

// Log configuration is process-wide, like the tracing dispatcher it feeds.
#[allow(clippy::declare_interior_mutable_const)]
const DEFAULT_LEVEL: AtomicU8 = AtomicU8::new(SaiLogLevel::Info as u8);
static API_LEVELS: [AtomicU8; SaiApi::COUNT] = [DEFAULT_LEVEL; SaiApi::COUNT];

/// Sets the minimum severity logged for `api`.
pub fn log_set(api: SaiApi, level: SaiLogLevel) {
    API_LEVELS[api as usize].store(level as u8, Ordering::Relaxed);
}

pub fn log_level(api: SaiApi) -> SaiLogLevel {
    SaiLogLevel::from_raw(API_LEVELS[api as usize].load(Ordering::Relaxed))
}

/// True when an event of `level` for `api` should be emitted.
pub fn log_enabled(api: SaiApi, level: SaiLogLevel) -> bool {
    level >= log_level(api)
}

/// Debug-level event tagged with a SAI API.
macro_rules! debug_log {
    ($api:expr, $($arg:tt)*) => {
        if $crate::logging::log_enabled($api, $crate::logging::SaiLogLevel::Debug) {
            tracing::debug!(api = %$api, $($arg)*)
        }
    };
}

/// Info-level event tagged with a SAI API.
macro_rules! info_log {
    ($api:expr, $($arg:tt)*) => {
        if $crate::logging::log_enabled($api, $crate::logging::SaiLogLevel::Info) {
            tracing::info!(api = %$api, $($arg)*)
        }
    };
}

/// Warning-level event tagged with a SAI API.
macro_rules! warn_log {
    ($api:expr, $($arg:tt)*) => {
        if $crate::logging::log_enabled($api, $crate::logging::SaiLogLevel::Warn) {
            tracing::warn!(api = %$api, $($arg)*)
        }
    };
}

/// Error-level event tagged with a SAI API. SAI critical maps here too.
macro_rules! error_log {
    ($api:expr, $($arg:tt)*) => {
        if $crate::logging::log_enabled($api, $crate::logging::SaiLogLevel::Error) {
            tracing::error!(api = %$api, $($arg)*)
        }
    };
}

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. Calling this again after a
/// subscriber is installed has no effect.
pub fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}
