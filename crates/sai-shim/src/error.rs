//! SAI status codes and the shim's error type.
//!
//! Callers of a SAI implementation only ever see a status code. [`SaiError`]
//! keeps enough context for logs, and [`SaiError::status`] collapses it to
//! the single [`SaiStatus`] returned across the API boundary.

use std::fmt;
use thiserror::Error;

use crate::handle::{Handle, ObjectType};
use crate::sdk::SdkError;

/// SAI status codes matching `sai_status_t`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiStatus {
    Success = 0,
    Failure = -1,
    NotSupported = -2,
    NoMemory = -3,
    InsufficientResources = -4,
    InvalidParameter = -5,
    ItemAlreadyExists = -6,
    ItemNotFound = -7,
    BufferOverflow = -8,
    InvalidPortNumber = -9,
    InvalidPortMember = -10,
    InvalidVlanId = -11,
    Uninitialized = -12,
    TableFull = -13,
    MandatoryAttributeMissing = -14,
    NotImplemented = -15,
    AddrNotFound = -16,
    ObjectInUse = -17,
    InvalidObjectType = -18,
    InvalidObjectId = -19,
}

impl SaiStatus {
    pub fn is_success(&self) -> bool {
        *self == SaiStatus::Success
    }

    pub fn as_raw(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for SaiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaiStatus::Success => "SAI_STATUS_SUCCESS",
            SaiStatus::Failure => "SAI_STATUS_FAILURE",
            SaiStatus::NotSupported => "SAI_STATUS_NOT_SUPPORTED",
            SaiStatus::NoMemory => "SAI_STATUS_NO_MEMORY",
            SaiStatus::InsufficientResources => "SAI_STATUS_INSUFFICIENT_RESOURCES",
            SaiStatus::InvalidParameter => "SAI_STATUS_INVALID_PARAMETER",
            SaiStatus::ItemAlreadyExists => "SAI_STATUS_ITEM_ALREADY_EXISTS",
            SaiStatus::ItemNotFound => "SAI_STATUS_ITEM_NOT_FOUND",
            SaiStatus::BufferOverflow => "SAI_STATUS_BUFFER_OVERFLOW",
            SaiStatus::InvalidPortNumber => "SAI_STATUS_INVALID_PORT_NUMBER",
            SaiStatus::InvalidPortMember => "SAI_STATUS_INVALID_PORT_MEMBER",
            SaiStatus::InvalidVlanId => "SAI_STATUS_INVALID_VLAN_ID",
            SaiStatus::Uninitialized => "SAI_STATUS_UNINITIALIZED",
            SaiStatus::TableFull => "SAI_STATUS_TABLE_FULL",
            SaiStatus::MandatoryAttributeMissing => "SAI_STATUS_MANDATORY_ATTRIBUTE_MISSING",
            SaiStatus::NotImplemented => "SAI_STATUS_NOT_IMPLEMENTED",
            SaiStatus::AddrNotFound => "SAI_STATUS_ADDR_NOT_FOUND",
            SaiStatus::ObjectInUse => "SAI_STATUS_OBJECT_IN_USE",
            SaiStatus::InvalidObjectType => "SAI_STATUS_INVALID_OBJECT_TYPE",
            SaiStatus::InvalidObjectId => "SAI_STATUS_INVALID_OBJECT_ID",
        };
        write!(f, "{}", s)
    }
}

/// SDK code → SAI status. Codes without a SAI counterpart become `Failure`.
impl From<SdkError> for SaiStatus {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::Param => SaiStatus::InvalidParameter,
            SdkError::Fail => SaiStatus::Failure,
            SdkError::Unavail => SaiStatus::NotSupported,
            SdkError::NotFound => SaiStatus::ItemNotFound,
            SdkError::Memory => SaiStatus::NoMemory,
            SdkError::Exists => SaiStatus::ItemAlreadyExists,
            SdkError::Port => SaiStatus::InvalidPortNumber,
            SdkError::Init => SaiStatus::Uninitialized,
            SdkError::Full => SaiStatus::TableFull,
            SdkError::Resource => SaiStatus::InsufficientResources,
            _ => SaiStatus::Failure,
        }
    }
}

/// Error type for shim operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaiError {
    /// The switch has not been initialized (or was shut down).
    #[error("switch not initialized")]
    Uninitialized,

    /// `initialize` was called twice.
    #[error("switch already initialized")]
    AlreadyInitialized,

    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("invalid object type: expected {expected}, got {handle:?}")]
    InvalidObjectType { expected: ObjectType, handle: Handle },

    #[error("invalid object id: {handle:?}")]
    InvalidObjectId { handle: Handle },

    #[error("invalid port number: {port}")]
    InvalidPortNumber { port: u32 },

    #[error("invalid VLAN ID: {vlan}")]
    InvalidVlanId { vlan: u32 },

    #[error("mandatory attribute missing: {attribute}")]
    MandatoryAttributeMissing { attribute: &'static str },

    #[error("item not found: {item}")]
    NotFound { item: String },

    #[error("item already exists: {item}")]
    AlreadyExists { item: String },

    /// A shim table has no free slot.
    #[error("resource exhausted: {table}")]
    ResourceExhausted { table: &'static str },

    #[error("table full: {table}")]
    TableFull { table: String },

    #[error("object in use: {object}")]
    ObjectInUse { object: String },

    /// Recognized but deliberately unhandled.
    #[error("not supported: {feature}")]
    NotSupported { feature: String },

    #[error("not implemented: {feature}")]
    NotImplemented { feature: String },

    /// An SDK call failed; the status comes from the SDK code.
    #[error("SDK {operation} failed: {error} (rv {})", .error.code())]
    Sdk {
        operation: &'static str,
        error: SdkError,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SaiError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        SaiError::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn not_found(item: impl Into<String>) -> Self {
        SaiError::NotFound { item: item.into() }
    }

    pub fn already_exists(item: impl Into<String>) -> Self {
        SaiError::AlreadyExists { item: item.into() }
    }

    pub fn table_full(table: impl Into<String>) -> Self {
        SaiError::TableFull {
            table: table.into(),
        }
    }

    pub fn object_in_use(object: impl Into<String>) -> Self {
        SaiError::ObjectInUse {
            object: object.into(),
        }
    }

    pub fn not_supported(feature: impl Into<String>) -> Self {
        SaiError::NotSupported {
            feature: feature.into(),
        }
    }

    pub fn not_implemented(feature: impl Into<String>) -> Self {
        SaiError::NotImplemented {
            feature: feature.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SaiError::Internal {
            message: message.into(),
        }
    }

    /// Returns a closure mapping an [`SdkError`] from `operation`.
    pub fn sdk(operation: &'static str) -> impl FnOnce(SdkError) -> SaiError {
        move |error| SaiError::Sdk { operation, error }
    }

    /// Status returned to the SAI caller for this error.
    pub fn status(&self) -> SaiStatus {
        match self {
            SaiError::Uninitialized => SaiStatus::Uninitialized,
            SaiError::AlreadyInitialized => SaiStatus::Failure,
            SaiError::InvalidParameter { .. } => SaiStatus::InvalidParameter,
            SaiError::InvalidObjectType { .. } => SaiStatus::InvalidObjectType,
            SaiError::InvalidObjectId { .. } => SaiStatus::InvalidObjectId,
            SaiError::InvalidPortNumber { .. } => SaiStatus::InvalidPortNumber,
            SaiError::InvalidVlanId { .. } => SaiStatus::InvalidVlanId,
            SaiError::MandatoryAttributeMissing { .. } => SaiStatus::MandatoryAttributeMissing,
            SaiError::NotFound { .. } => SaiStatus::ItemNotFound,
            SaiError::AlreadyExists { .. } => SaiStatus::ItemAlreadyExists,
            SaiError::ResourceExhausted { .. } => SaiStatus::InsufficientResources,
            SaiError::TableFull { .. } => SaiStatus::TableFull,
            SaiError::ObjectInUse { .. } => SaiStatus::ObjectInUse,
            SaiError::NotSupported { .. } => SaiStatus::NotSupported,
            SaiError::NotImplemented { .. } => SaiStatus::NotImplemented,
            SaiError::Sdk { error, .. } => SaiStatus::from(*error),
            SaiError::Internal { .. } => SaiStatus::Failure,
        }
    }
}

/// Result type for shim operations.
pub type SaiResult<T> = Result<T, SaiError>;

/// Collapses a result to the status code a SAI caller would see.
pub fn to_status<T>(result: &SaiResult<T>) -> SaiStatus {
    match result {
        Ok(_) => SaiStatus::Success,
        Err(err) => err.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sdk_translation_table() {
        let cases = [
            (SdkError::Param, SaiStatus::InvalidParameter),
            (SdkError::Fail, SaiStatus::Failure),
            (SdkError::Unavail, SaiStatus::NotSupported),
            (SdkError::NotFound, SaiStatus::ItemNotFound),
            (SdkError::Memory, SaiStatus::NoMemory),
            (SdkError::Exists, SaiStatus::ItemAlreadyExists),
            (SdkError::Port, SaiStatus::InvalidPortNumber),
            (SdkError::Init, SaiStatus::Uninitialized),
            (SdkError::Full, SaiStatus::TableFull),
            (SdkError::Resource, SaiStatus::InsufficientResources),
        ];
        for (sdk, sai) in cases {
            assert_eq!(SaiStatus::from(sdk), sai, "{:?}", sdk);
        }
    }

    #[test]
    fn test_unrecognized_sdk_codes_fail() {
        for sdk in [
            SdkError::Internal,
            SdkError::Timeout,
            SdkError::Busy,
            SdkError::BadId,
            SdkError::Unknown(-99),
        ] {
            assert_eq!(SaiStatus::from(sdk), SaiStatus::Failure);
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(SaiError::Uninitialized.status(), SaiStatus::Uninitialized);
        assert_eq!(SaiError::AlreadyInitialized.status(), SaiStatus::Failure);
        assert_eq!(
            SaiError::ResourceExhausted { table: "vrf" }.status(),
            SaiStatus::InsufficientResources
        );
        let sdk = SaiError::sdk("l3 intf create")(SdkError::Full);
        assert_eq!(sdk.status(), SaiStatus::TableFull);
        assert_eq!(sdk.to_string(), "SDK l3 intf create failed: table full (rv -6)");
    }

    #[test]
    fn test_status_display_and_raw() {
        assert_eq!(SaiStatus::ItemNotFound.to_string(), "SAI_STATUS_ITEM_NOT_FOUND");
        assert_eq!(SaiStatus::InvalidObjectId.as_raw(), -19);
        assert!(SaiStatus::Success.is_success());
    }

    #[test]
    fn test_to_status() {
        let ok: SaiResult<u32> = Ok(1);
        assert_eq!(to_status(&ok), SaiStatus::Success);
        let err: SaiResult<u32> = Err(SaiError::not_implemented("flush"));
        assert_eq!(to_status(&err), SaiStatus::NotImplemented);
    }
}
