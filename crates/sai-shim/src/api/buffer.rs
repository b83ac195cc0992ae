//! Buffer pools, buffer profiles and ingress priority groups.
//!
//! Pools are programmed into the SDK at their table id. Profiles are kept
//! in the shim and reach the SDK when bound to an ingress priority group.
//! A pool cannot be removed while a profile points at it, nor a profile
//! while a priority group uses it.
//!
//! Priority groups are not allocated; like queues their handles carry the
//! port in the map field and the group index in the value.

use crate::attr::{attr_ids, check_get_list, find, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{BufferPoolConfig, IngressPgConfig, SharedLimit, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch, SwitchContext};

attr_ids! {
    pub enum BufferPoolAttr {
        SharedSize => "SAI_BUFFER_POOL_ATTR_SHARED_SIZE",
        Type => "SAI_BUFFER_POOL_ATTR_TYPE",
        Size => "SAI_BUFFER_POOL_ATTR_SIZE",
        ThMode => "SAI_BUFFER_POOL_ATTR_TH_MODE",
    }
}

attr_ids! {
    pub enum BufferProfileAttr {
        PoolId => "SAI_BUFFER_PROFILE_ATTR_POOL_ID",
        BufferSize => "SAI_BUFFER_PROFILE_ATTR_BUFFER_SIZE",
        SharedDynamicTh => "SAI_BUFFER_PROFILE_ATTR_SHARED_DYNAMIC_TH",
        SharedStaticTh => "SAI_BUFFER_PROFILE_ATTR_SHARED_STATIC_TH",
        XoffTh => "SAI_BUFFER_PROFILE_ATTR_XOFF_TH",
        XonTh => "SAI_BUFFER_PROFILE_ATTR_XON_TH",
    }
}

attr_ids! {
    pub enum IngressPriorityGroupAttr {
        BufferProfile => "SAI_INGRESS_PRIORITY_GROUP_ATTR_BUFFER_PROFILE",
    }
}

pub const INGRESS_PRIORITY_GROUPS_PER_PORT: u32 = 8;

/// `sai_buffer_pool_type_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPoolType {
    Ingress = 0,
    Egress = 1,
}

/// `sai_buffer_threshold_mode_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferThresholdMode {
    Static = 0,
    #[default]
    Dynamic = 1,
}

impl BufferThresholdMode {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(BufferThresholdMode::Static),
            1 => Some(BufferThresholdMode::Dynamic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolRecord {
    pub pool_type: BufferPoolType,
    /// Bytes.
    pub size: u32,
    pub th_mode: BufferThresholdMode,
}

impl BufferPoolRecord {
    fn sdk_config(&self) -> BufferPoolConfig {
        BufferPoolConfig {
            ingress: self.pool_type == BufferPoolType::Ingress,
            size: self.size,
            dynamic_threshold: self.th_mode == BufferThresholdMode::Dynamic,
        }
    }
}

/// Shared-buffer threshold of a profile; the variant follows the pool's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileThreshold {
    /// Alpha exponent, -8..=7.
    Dynamic(i8),
    /// Bytes.
    Static(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferProfileRecord {
    pub pool: u32,
    pub size: u32,
    pub threshold: ProfileThreshold,
    pub xoff: u32,
    pub xon: u32,
}

fn pool_id(ctx: &SwitchContext, handle: Handle) -> SaiResult<u32> {
    let id = expect_type(handle, ObjectType::BufferPool)?;
    ctx.buffer_pools.get(id)?;
    Ok(id)
}

fn profile_id(ctx: &SwitchContext, handle: Handle) -> SaiResult<u32> {
    let id = expect_type(handle, ObjectType::BufferProfile)?;
    ctx.buffer_profiles.get(id)?;
    Ok(id)
}

/// Handle of ingress priority group `index` of `port`.
pub fn ingress_priority_group_handle(port: u32, index: u32) -> SaiResult<Handle> {
    let map = u16::try_from(port).map_err(|_| SaiError::InvalidPortNumber { port })?;
    Ok(Handle::encode_with_map(ObjectType::PriorityGroup, 0, map, index))
}

/// Port and group index of a priority-group handle.
fn decode_priority_group(ctx: &SwitchContext, handle: Handle) -> SaiResult<(u32, u32)> {
    if handle.decode_type() != ObjectType::PriorityGroup {
        return Err(SaiError::InvalidObjectType {
            expected: ObjectType::PriorityGroup,
            handle,
        });
    }
    let port = u32::from(handle.decode_map());
    let index = handle.index();
    if !ctx.has_port(port) || index >= INGRESS_PRIORITY_GROUPS_PER_PORT {
        return Err(SaiError::InvalidObjectId { handle });
    }
    Ok((port, index))
}

fn pg_config(profile: &BufferProfileRecord) -> IngressPgConfig {
    IngressPgConfig {
        pool: profile.pool,
        min: profile.size,
        shared: match profile.threshold {
            ProfileThreshold::Dynamic(alpha) => SharedLimit::Dynamic(alpha),
            ProfileThreshold::Static(bytes) => SharedLimit::Static(bytes),
        },
        xoff: profile.xoff,
        xon: profile.xon,
    }
}

fn parse_pool(attrs: &[Attribute<BufferPoolAttr>]) -> SaiResult<BufferPoolRecord> {
    let mut pool_type = None;
    let mut size = None;
    let mut th_mode = BufferThresholdMode::default();
    for attr in attrs {
        match attr.id {
            BufferPoolAttr::Type => {
                pool_type = Some(match attr.as_s32()? {
                    0 => BufferPoolType::Ingress,
                    1 => BufferPoolType::Egress,
                    raw => return Err(SaiError::invalid_parameter(format!("buffer pool type {}", raw))),
                });
            }
            BufferPoolAttr::Size => size = Some(attr.as_u32()?),
            BufferPoolAttr::ThMode => {
                let raw = attr.as_s32()?;
                th_mode = BufferThresholdMode::from_s32(raw)
                    .ok_or_else(|| SaiError::invalid_parameter(format!("threshold mode {}", raw)))?;
            }
            BufferPoolAttr::SharedSize => {
                return Err(SaiError::invalid_parameter("SAI_BUFFER_POOL_ATTR_SHARED_SIZE is read-only"));
            }
        }
    }
    Ok(BufferPoolRecord {
        pool_type: pool_type.ok_or(SaiError::MandatoryAttributeMissing {
            attribute: "SAI_BUFFER_POOL_ATTR_TYPE",
        })?,
        size: size.ok_or(SaiError::MandatoryAttributeMissing {
            attribute: "SAI_BUFFER_POOL_ATTR_SIZE",
        })?,
        th_mode,
    })
}

fn parse_profile(ctx: &SwitchContext, attrs: &[Attribute<BufferProfileAttr>]) -> SaiResult<BufferProfileRecord> {
    let pool = match find(attrs, BufferProfileAttr::PoolId) {
        Some(attr) => pool_id(ctx, attr.as_oid()?)
            .map_err(|_| SaiError::invalid_parameter(format!("invalid buffer pool {:?}", attr.value)))?,
        None => {
            return Err(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_BUFFER_PROFILE_ATTR_POOL_ID",
            })
        }
    };
    let mode = ctx.buffer_pools.get(pool)?.th_mode;

    let mut record = BufferProfileRecord {
        pool,
        size: 0,
        threshold: match mode {
            BufferThresholdMode::Dynamic => ProfileThreshold::Dynamic(0),
            BufferThresholdMode::Static => ProfileThreshold::Static(0),
        },
        xoff: 0,
        xon: 0,
    };
    let mut size = None;
    for attr in attrs {
        match attr.id {
            BufferProfileAttr::PoolId => {}
            BufferProfileAttr::BufferSize => size = Some(attr.as_u32()?),
            BufferProfileAttr::SharedDynamicTh => {
                if mode != BufferThresholdMode::Dynamic {
                    return Err(SaiError::invalid_parameter("dynamic threshold on a static pool"));
                }
                let raw = attr.as_s32()?;
                let alpha = i8::try_from(raw)
                    .ok()
                    .filter(|a| (-8..=7).contains(a))
                    .ok_or_else(|| SaiError::invalid_parameter(format!("dynamic threshold {}", raw)))?;
                record.threshold = ProfileThreshold::Dynamic(alpha);
            }
            BufferProfileAttr::SharedStaticTh => {
                if mode != BufferThresholdMode::Static {
                    return Err(SaiError::invalid_parameter("static threshold on a dynamic pool"));
                }
                record.threshold = ProfileThreshold::Static(attr.as_u32()?);
            }
            BufferProfileAttr::XoffTh => record.xoff = attr.as_u32()?,
            BufferProfileAttr::XonTh => record.xon = attr.as_u32()?,
        }
    }
    record.size = size.ok_or(SaiError::MandatoryAttributeMissing {
        attribute: "SAI_BUFFER_PROFILE_ATTR_BUFFER_SIZE",
    })?;
    Ok(record)
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_buffer_pool(&mut self, attrs: &[Attribute<BufferPoolAttr>]) -> SaiResult<Handle> {
        let (sdk, ctx) = self.parts_mut()?;
        let record = parse_pool(attrs)?;
        let id = ctx.buffer_pools.next_free()?;
        sdk.buffer_pool_set(id, Some(&record.sdk_config()))
            .map_err(SaiError::sdk("buffer_pool_set"))?;
        info_log!(SaiApi::Buffers, pool = id, size = record.size, "buffer pool created");
        ctx.buffer_pools.insert_at(id, record)?;
        Ok(Handle::encode(ObjectType::BufferPool, id))
    }

    pub fn remove_buffer_pool(&mut self, pool: Handle) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let id = pool_id(ctx, pool)?;
        if ctx.buffer_profiles.iter().any(|(_, p)| p.pool == id) {
            warn_log!(SaiApi::Buffers, pool = id, "buffer pool still referenced");
            return Err(SaiError::object_in_use(format!("buffer pool {}", id)));
        }
        sdk.buffer_pool_set(id, None)
            .map_err(SaiError::sdk("buffer_pool_set"))?;
        ctx.buffer_pools.release(id);
        info_log!(SaiApi::Buffers, pool = id, "buffer pool removed");
        Ok(())
    }

    pub fn set_buffer_pool_attribute(&mut self, _pool: Handle, attr: &Attribute<BufferPoolAttr>) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("buffer pool set {:?}", attr.id)))
    }

    pub fn get_buffer_pool_attribute(&self, pool: Handle, attrs: &mut [Attribute<BufferPoolAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let id = pool_id(ctx, pool)?;
        let record = ctx.buffer_pools.get(id)?;
        let reserved: u32 = ctx
            .buffer_profiles
            .iter()
            .filter(|(_, p)| p.pool == id)
            .map(|(_, p)| p.size)
            .fold(0, u32::saturating_add);

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                BufferPoolAttr::SharedSize => AttributeValue::U32(record.size.saturating_sub(reserved)),
                BufferPoolAttr::Type => AttributeValue::S32(record.pool_type as i32),
                BufferPoolAttr::Size => AttributeValue::U32(record.size),
                BufferPoolAttr::ThMode => AttributeValue::S32(record.th_mode as i32),
            };
        }
        Ok(())
    }

    pub fn create_buffer_profile(&mut self, attrs: &[Attribute<BufferProfileAttr>]) -> SaiResult<Handle> {
        let (_, ctx) = self.parts_mut()?;
        let record = parse_profile(ctx, attrs)?;
        let pool = record.pool;
        let id = ctx.buffer_profiles.allocate(record)?;
        debug_log!(SaiApi::Buffers, profile = id, pool, "buffer profile created");
        Ok(Handle::encode(ObjectType::BufferProfile, id))
    }

    pub fn remove_buffer_profile(&mut self, profile: Handle) -> SaiResult<()> {
        let (_, ctx) = self.parts_mut()?;
        let id = profile_id(ctx, profile)?;
        if ctx.priority_group_profiles.values().any(|&bound| bound == id) {
            warn_log!(SaiApi::Buffers, profile = id, "buffer profile still bound");
            return Err(SaiError::object_in_use(format!("buffer profile {}", id)));
        }
        ctx.buffer_profiles.release(id);
        debug_log!(SaiApi::Buffers, profile = id, "buffer profile removed");
        Ok(())
    }

    pub fn set_buffer_profile_attribute(
        &mut self,
        _profile: Handle,
        attr: &Attribute<BufferProfileAttr>,
    ) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("buffer profile set {:?}", attr.id)))
    }

    pub fn get_buffer_profile_attribute(
        &self,
        profile: Handle,
        attrs: &mut [Attribute<BufferProfileAttr>],
    ) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let record = ctx.buffer_profiles.get(profile_id(ctx, profile)?)?;

        for attr in attrs.iter_mut() {
            attr.value = match (attr.id, record.threshold) {
                (BufferProfileAttr::PoolId, _) => {
                    AttributeValue::Oid(Handle::encode(ObjectType::BufferPool, record.pool))
                }
                (BufferProfileAttr::BufferSize, _) => AttributeValue::U32(record.size),
                (BufferProfileAttr::SharedDynamicTh, ProfileThreshold::Dynamic(alpha)) => {
                    AttributeValue::S32(alpha.into())
                }
                (BufferProfileAttr::SharedStaticTh, ProfileThreshold::Static(bytes)) => {
                    AttributeValue::U32(bytes)
                }
                (BufferProfileAttr::XoffTh, _) => AttributeValue::U32(record.xoff),
                (BufferProfileAttr::XonTh, _) => AttributeValue::U32(record.xon),
                (id, _) => {
                    return Err(SaiError::invalid_parameter(format!(
                        "{:?} does not apply to this profile",
                        id
                    )))
                }
            };
        }
        Ok(())
    }

    /// Binds a buffer profile from an ingress pool; the null handle unbinds.
    pub fn set_ingress_priority_group_attribute(
        &mut self,
        pg: Handle,
        attr: &Attribute<IngressPriorityGroupAttr>,
    ) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let (port, index) = decode_priority_group(ctx, pg)?;
        match attr.id {
            IngressPriorityGroupAttr::BufferProfile => {
                let profile = attr.as_oid()?;
                if profile == Handle::NULL {
                    sdk.ingress_pg_set(port, index, None)
                        .map_err(SaiError::sdk("ingress_pg_set"))?;
                    ctx.priority_group_profiles.remove(&pg);
                    debug_log!(SaiApi::Buffers, port, pg = index, "priority group unbound");
                    return Ok(());
                }

                let id = profile_id(ctx, profile)
                    .map_err(|_| SaiError::invalid_parameter(format!("invalid buffer profile {:?}", profile)))?;
                let record = ctx.buffer_profiles.get(id)?;
                if ctx.buffer_pools.get(record.pool)?.pool_type != BufferPoolType::Ingress {
                    return Err(SaiError::invalid_parameter(format!(
                        "buffer profile {} is not from an ingress pool",
                        id
                    )));
                }
                sdk.ingress_pg_set(port, index, Some(&pg_config(record)))
                    .map_err(|e| {
                        error_log!(SaiApi::Buffers, port, pg = index, profile = id, error = %e, "priority group programming failed");
                        SaiError::sdk("ingress_pg_set")(e)
                    })?;
                ctx.priority_group_profiles.insert(pg, id);
                info_log!(SaiApi::Buffers, port, pg = index, profile = id, "priority group bound");
                Ok(())
            }
        }
    }

    pub fn get_ingress_priority_group_attribute(
        &self,
        pg: Handle,
        attrs: &mut [Attribute<IngressPriorityGroupAttr>],
    ) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        decode_priority_group(ctx, pg)?;
        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                IngressPriorityGroupAttr::BufferProfile => AttributeValue::Oid(
                    ctx.priority_group_profiles
                        .get(&pg)
                        .map_or(Handle::NULL, |&id| Handle::encode(ObjectType::BufferProfile, id)),
                ),
            };
        }
        Ok(())
    }
}
