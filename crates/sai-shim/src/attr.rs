//! SAI attribute lists.
//!
//! An attribute list is an ordered slice of `(id, value)` pairs supplied by
//! the caller. Create and set operations only read it. Get operations fill
//! `value` in place and never reorder, add or drop entries.

use std::fmt;
use std::net::IpAddr;

use sai_types::MacAddress;

use crate::error::{SaiError, SaiResult};
use crate::handle::Handle;

/// Per-object attribute identifier.
pub trait AttrId: Copy + Eq + fmt::Debug {
    /// `SAI_*_ATTR_*` name for logs.
    fn name(&self) -> &'static str;
}

/// Declares an attribute id enum with its SAI names.
macro_rules! attr_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $sai:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::attr::AttrId for $name {
            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $sai),*
                }
            }
        }
    };
}
pub(crate) use attr_ids;

/// Tagged value union.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttributeValue {
    /// Placeholder in get requests.
    #[default]
    None,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    S32(i32),
    U64(u64),
    Mac(MacAddress),
    Ip(IpAddr),
    Oid(Handle),
    OidList(Vec<Handle>),
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            AttributeValue::None => "none",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::U8(_) => "u8",
            AttributeValue::U16(_) => "u16",
            AttributeValue::U32(_) => "u32",
            AttributeValue::S32(_) => "s32",
            AttributeValue::U64(_) => "u64",
            AttributeValue::Mac(_) => "mac",
            AttributeValue::Ip(_) => "ip",
            AttributeValue::Oid(_) => "oid",
            AttributeValue::OidList(_) => "objlist",
        }
    }
}

/// One attribute list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<I> {
    pub id: I,
    pub value: AttributeValue,
}

impl<I: AttrId> Attribute<I> {
    pub fn new(id: I, value: AttributeValue) -> Self {
        Self { id, value }
    }

    /// Entry for a get request.
    pub fn query(id: I) -> Self {
        Self {
            id,
            value: AttributeValue::None,
        }
    }

    fn mismatch(&self, expected: &str) -> SaiError {
        SaiError::invalid_parameter(format!(
            "{} expects {} value, got {}",
            self.id.name(),
            expected,
            self.value.kind()
        ))
    }

    pub fn as_bool(&self) -> SaiResult<bool> {
        match self.value {
            AttributeValue::Bool(v) => Ok(v),
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn as_u8(&self) -> SaiResult<u8> {
        match self.value {
            AttributeValue::U8(v) => Ok(v),
            _ => Err(self.mismatch("u8")),
        }
    }

    pub fn as_u16(&self) -> SaiResult<u16> {
        match self.value {
            AttributeValue::U16(v) => Ok(v),
            _ => Err(self.mismatch("u16")),
        }
    }

    pub fn as_u32(&self) -> SaiResult<u32> {
        match self.value {
            AttributeValue::U32(v) => Ok(v),
            _ => Err(self.mismatch("u32")),
        }
    }

    pub fn as_s32(&self) -> SaiResult<i32> {
        match self.value {
            AttributeValue::S32(v) => Ok(v),
            _ => Err(self.mismatch("s32")),
        }
    }

    pub fn as_u64(&self) -> SaiResult<u64> {
        match self.value {
            AttributeValue::U64(v) => Ok(v),
            _ => Err(self.mismatch("u64")),
        }
    }

    pub fn as_mac(&self) -> SaiResult<MacAddress> {
        match self.value {
            AttributeValue::Mac(v) => Ok(v),
            _ => Err(self.mismatch("mac")),
        }
    }

    pub fn as_oid(&self) -> SaiResult<Handle> {
        match self.value {
            AttributeValue::Oid(v) => Ok(v),
            _ => Err(self.mismatch("oid")),
        }
    }

    pub fn as_oid_list(&self) -> SaiResult<&[Handle]> {
        match &self.value {
            AttributeValue::OidList(v) => Ok(v),
            _ => Err(self.mismatch("objlist")),
        }
    }
}

/// First entry with `id`, if any.
pub fn find<I: AttrId>(attrs: &[Attribute<I>], id: I) -> Option<&Attribute<I>> {
    attrs.iter().find(|a| a.id == id)
}

/// Rejects an empty attribute list on get.
pub(crate) fn check_get_list<I>(attrs: &[Attribute<I>]) -> SaiResult<()> {
    if attrs.is_empty() {
        return Err(SaiError::invalid_parameter("empty attribute list"));
    }
    Ok(())
}
