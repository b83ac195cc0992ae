//! Scheduler profiles.
//!
//! A profile is a record in the shim's scheduler table. It only reaches the
//! SDK when bound to a port (`SAI_PORT_ATTR_QOS_SCHEDULER_PROFILE_ID`) or a
//! queue (`SAI_QUEUE_ATTR_SCHEDULER_PROFILE_ID`). Each record remembers
//! which objects it is bound to so that attribute changes reach the
//! hardware, and so that removal can restore SDK defaults first.

use crate::attr::{attr_ids, check_get_list, AttrId, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::{QueueSelector, ScheduleMode, SchedulerConfig, ShaperUnit, SwitchSdk};
use crate::switch::{expect_type, SaiSwitch, SwitchContext};

use super::port::PortAttr;
use super::queue::QueueAttr;

pub const WEIGHT_MIN: u8 = 1;
pub const WEIGHT_MAX: u8 = 100;

attr_ids! {
    pub enum SchedulerAttr {
        SchedulingAlgorithm => "SAI_SCHEDULER_ATTR_SCHEDULING_ALGORITHM",
        SchedulingWeight => "SAI_SCHEDULER_ATTR_SCHEDULING_WEIGHT",
        ShaperType => "SAI_SCHEDULER_ATTR_SHAPER_TYPE",
        MinBandwidthRate => "SAI_SCHEDULER_ATTR_MIN_BANDWIDTH_RATE",
        MinBandwidthBurstRate => "SAI_SCHEDULER_ATTR_MIN_BANDWIDTH_BURST_RATE",
        MaxBandwidthRate => "SAI_SCHEDULER_ATTR_MAX_BANDWIDTH_RATE",
        MaxBandwidthBurstRate => "SAI_SCHEDULER_ATTR_MAX_BANDWIDTH_BURST_RATE",
    }
}

/// `sai_scheduling_type_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingAlgorithm {
    Strict = 0,
    #[default]
    Wrr = 1,
    Dwrr = 2,
}

impl SchedulingAlgorithm {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(SchedulingAlgorithm::Strict),
            1 => Some(SchedulingAlgorithm::Wrr),
            2 => Some(SchedulingAlgorithm::Dwrr),
            _ => None,
        }
    }

    fn mode(self) -> ScheduleMode {
        match self {
            SchedulingAlgorithm::Strict => ScheduleMode::Strict,
            SchedulingAlgorithm::Wrr => ScheduleMode::WeightedRoundRobin,
            SchedulingAlgorithm::Dwrr => ScheduleMode::WeightedDeficitRoundRobin,
        }
    }
}

/// `sai_meter_type_t`: unit of the shaper rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterType {
    Packets = 0,
    #[default]
    Bytes = 1,
}

impl MeterType {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(MeterType::Packets),
            1 => Some(MeterType::Bytes),
            _ => None,
        }
    }

    fn unit(self) -> ShaperUnit {
        match self {
            MeterType::Packets => ShaperUnit::Packets,
            MeterType::Bytes => ShaperUnit::Kbits,
        }
    }
}

/// Converts a SAI rate to the SDK unit for `meter`.
///
/// Packet rates pass through. Byte rates (bytes/s or bytes) become kbit/s
/// (or kbit). Results that do not fit 32 bits are rejected.
pub fn shaper_rate(meter: MeterType, raw: u64) -> SaiResult<u32> {
    let converted = match meter {
        MeterType::Packets => Some(raw),
        MeterType::Bytes => raw.checked_mul(8).map(|bits| bits / 1000),
    };
    converted
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            SaiError::invalid_parameter(format!("rate {} out of range for {:?}", raw, meter))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerRecord {
    pub algorithm: SchedulingAlgorithm,
    pub weight: u8,
    pub meter_type: MeterType,
    /// Rates in SDK units (kbit/s or packets/s).
    pub min_rate: u32,
    pub min_burst: u32,
    pub max_rate: u32,
    pub max_burst: u32,
    /// Ports and queues using this profile, in attach order.
    attached: Vec<Handle>,
    ref_count: u32,
}

impl Default for SchedulerRecord {
    fn default() -> Self {
        Self {
            algorithm: SchedulingAlgorithm::default(),
            weight: WEIGHT_MIN,
            meter_type: MeterType::default(),
            min_rate: 0,
            min_burst: 0,
            max_rate: 0,
            max_burst: 0,
            attached: Vec::new(),
            ref_count: 0,
        }
    }
}

impl SchedulerRecord {
    pub fn attached(&self) -> &[Handle] {
        &self.attached
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub(crate) fn attach(&mut self, object: Handle) {
        self.attached.push(object);
        self.ref_count += 1;
    }

    /// Returns false when `object` was not attached.
    pub(crate) fn detach(&mut self, object: Handle) -> bool {
        match self.attached.iter().position(|h| *h == object) {
            Some(pos) => {
                self.attached.remove(pos);
                self.ref_count = self.ref_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Validates and stores one attribute. The record is untouched on error.
    fn apply(&mut self, attr: &Attribute<SchedulerAttr>) -> SaiResult<()> {
        match attr.id {
            SchedulerAttr::SchedulingAlgorithm => {
                let raw = attr.as_s32()?;
                self.algorithm = SchedulingAlgorithm::from_s32(raw).ok_or_else(|| {
                    SaiError::invalid_parameter(format!("unknown scheduling algorithm {}", raw))
                })?;
            }
            SchedulerAttr::SchedulingWeight => {
                let weight = attr.as_u8()?;
                if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&weight) {
                    return Err(SaiError::invalid_parameter(format!(
                        "weight {} outside {}..={}",
                        weight, WEIGHT_MIN, WEIGHT_MAX
                    )));
                }
                self.weight = weight;
            }
            SchedulerAttr::ShaperType => {
                let raw = attr.as_s32()?;
                self.meter_type = MeterType::from_s32(raw).ok_or_else(|| {
                    SaiError::invalid_parameter(format!("unknown shaper type {}", raw))
                })?;
            }
            SchedulerAttr::MinBandwidthRate => {
                self.min_rate = shaper_rate(self.meter_type, attr.as_u64()?)?;
            }
            SchedulerAttr::MinBandwidthBurstRate => {
                self.min_burst = shaper_rate(self.meter_type, attr.as_u64()?)?;
            }
            SchedulerAttr::MaxBandwidthRate => {
                self.max_rate = shaper_rate(self.meter_type, attr.as_u64()?)?;
            }
            SchedulerAttr::MaxBandwidthBurstRate => {
                self.max_burst = shaper_rate(self.meter_type, attr.as_u64()?)?;
            }
        }
        Ok(())
    }

    fn value_of(&self, id: SchedulerAttr) -> AttributeValue {
        match id {
            SchedulerAttr::SchedulingAlgorithm => AttributeValue::S32(self.algorithm as i32),
            SchedulerAttr::SchedulingWeight => AttributeValue::U8(self.weight),
            SchedulerAttr::ShaperType => AttributeValue::S32(self.meter_type as i32),
            SchedulerAttr::MinBandwidthRate => AttributeValue::U64(self.min_rate.into()),
            SchedulerAttr::MinBandwidthBurstRate => AttributeValue::U64(self.min_burst.into()),
            SchedulerAttr::MaxBandwidthRate => AttributeValue::U64(self.max_rate.into()),
            SchedulerAttr::MaxBandwidthBurstRate => AttributeValue::U64(self.max_burst.into()),
        }
    }

    pub fn sdk_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            mode: self.algorithm.mode(),
            weight: self.weight,
            unit: self.meter_type.unit(),
            min_rate: self.min_rate,
            min_burst: self.min_burst,
            max_rate: self.max_rate,
            max_burst: self.max_burst,
        }
    }
}

/// Where a bound profile is programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerTarget {
    Port(u32),
    Queue(QueueSelector),
}

impl SchedulerTarget {
    fn program<S: SwitchSdk>(&self, sdk: &S, config: Option<&SchedulerConfig>) -> SaiResult<()> {
        match *self {
            SchedulerTarget::Port(port) => sdk
                .port_scheduler_set(port, config)
                .map_err(SaiError::sdk("port_scheduler_set")),
            SchedulerTarget::Queue(queue) => sdk
                .queue_scheduler_set(queue, config)
                .map_err(SaiError::sdk("queue_scheduler_set")),
        }
    }
}

/// Scheduler id behind a profile handle. Wrong type or a free slot is an
/// invalid parameter.
fn profile_id(ctx: &SwitchContext, handle: Handle) -> SaiResult<u32> {
    let id = expect_type(handle, ObjectType::Scheduler)
        .map_err(|_| SaiError::invalid_parameter(format!("not a scheduler: {:?}", handle)))?;
    if !ctx.schedulers.contains(id) {
        return Err(SaiError::invalid_parameter(format!(
            "unknown scheduler {:?}",
            handle
        )));
    }
    Ok(id)
}

/// Binds `profile` to `object`, programming `target`. A null profile
/// restores the SDK default and unbinds.
///
/// Re-binding the same profile reprograms the hardware without attaching
/// twice.
pub(crate) fn bind_scheduler<S: SwitchSdk>(
    sdk: &S,
    ctx: &mut SwitchContext,
    object: Handle,
    target: SchedulerTarget,
    profile: Handle,
) -> SaiResult<()> {
    let new_id = if profile.is_null() {
        None
    } else {
        let id = expect_type(profile, ObjectType::Scheduler)?;
        if !ctx.schedulers.contains(id) {
            return Err(SaiError::invalid_parameter(format!(
                "unknown scheduler {:?}",
                profile
            )));
        }
        Some(id)
    };

    let config = match new_id {
        Some(id) => Some(ctx.schedulers.get(id)?.sdk_config()),
        None => None,
    };
    target.program(sdk, config.as_ref())?;

    let old_id = ctx.scheduler_bindings.get(&object).copied();
    if old_id == new_id {
        return Ok(());
    }
    if let Some(old) = old_id {
        if let Ok(record) = ctx.schedulers.get_mut(old) {
            record.detach(object);
        }
        ctx.scheduler_bindings.remove(&object);
    }
    if let Some(id) = new_id {
        ctx.schedulers.get_mut(id)?.attach(object);
        ctx.scheduler_bindings.insert(object, id);
    }
    debug_log!(SaiApi::Scheduler, object = ?object, profile = ?profile, "scheduler bound");
    Ok(())
}

/// Programming target for a port or queue handle.
fn target_of(ctx: &SwitchContext, object: Handle) -> SaiResult<SchedulerTarget> {
    match object.decode_type() {
        ObjectType::Port => Ok(SchedulerTarget::Port(ctx.port_from_handle(object)?)),
        ObjectType::Queue => {
            let (_, selector) = super::queue::decode_queue(ctx, object)?;
            Ok(SchedulerTarget::Queue(selector))
        }
        _ => Err(SaiError::internal(format!(
            "scheduler attached to {:?}",
            object
        ))),
    }
}

/// Restores the SDK default on every object bound to scheduler `id` and
/// empties its attachment list.
fn detach_all_and_restore<S: SwitchSdk>(sdk: &S, ctx: &mut SwitchContext, id: u32) -> SaiResult<()> {
    let attached = ctx.schedulers.get(id)?.attached.clone();
    for object in attached {
        let target = target_of(ctx, object)?;
        target.program(sdk, None).map_err(|e| {
            error_log!(SaiApi::Scheduler, object = ?object, error = %e, "restoring default scheduler failed");
            e
        })?;
        ctx.scheduler_bindings.remove(&object);
        ctx.schedulers.get_mut(id)?.detach(object);
    }
    Ok(())
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_scheduler_profile(
        &mut self,
        attrs: &[Attribute<SchedulerAttr>],
    ) -> SaiResult<Handle> {
        let (_, ctx) = self.parts_mut()?;

        // Rates are interpreted in the shaper's unit, so the type goes first.
        let mut record = SchedulerRecord::default();
        let (shaper, rest): (Vec<_>, Vec<_>) = attrs
            .iter()
            .partition(|a| a.id == SchedulerAttr::ShaperType);
        for attr in shaper.into_iter().chain(rest) {
            record.apply(attr).map_err(|e| {
                warn_log!(SaiApi::Scheduler, attr = attr.id.name(), error = %e, "rejected scheduler attribute");
                e
            })?;
        }

        let id = ctx.schedulers.allocate(record)?;
        let handle = Handle::encode(ObjectType::Scheduler, id);
        info_log!(SaiApi::Scheduler, scheduler = ?handle, "scheduler profile created");
        Ok(handle)
    }

    /// Unbinds the profile everywhere (restoring SDK defaults) and frees it.
    pub fn remove_scheduler_profile(&mut self, scheduler_id: Handle) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let id = profile_id(ctx, scheduler_id)?;
        detach_all_and_restore(sdk, ctx, id)?;
        ctx.schedulers.release(id);
        info_log!(SaiApi::Scheduler, scheduler = ?scheduler_id, "scheduler profile removed");
        Ok(())
    }

    /// Updates the profile and reprograms every object bound to it.
    pub fn set_scheduler_attribute(
        &mut self,
        scheduler_id: Handle,
        attr: &Attribute<SchedulerAttr>,
    ) -> SaiResult<()> {
        let (_, ctx) = self.parts_mut()?;
        let id = profile_id(ctx, scheduler_id)?;
        let record = ctx.schedulers.get_mut(id)?;
        record.apply(attr)?;
        let attached = record.attached.clone();
        debug_log!(SaiApi::Scheduler, scheduler = ?scheduler_id, attr = attr.id.name(), bound = attached.len(), "scheduler attribute set");

        self.propagate_scheduler_change(scheduler_id, attached)
    }

    /// Re-applies the profile to each bound object through its own setter.
    /// Stops at the first failure; objects already updated keep the change.
    fn propagate_scheduler_change(&mut self, scheduler_id: Handle, attached: Vec<Handle>) -> SaiResult<()> {
        let value = AttributeValue::Oid(scheduler_id);
        for object in attached {
            let result = match object.decode_type() {
                ObjectType::Port => self.set_port_attribute(
                    object,
                    &Attribute::new(PortAttr::QosSchedulerProfileId, value.clone()),
                ),
                ObjectType::Queue => self.set_queue_attribute(
                    object,
                    &Attribute::new(QueueAttr::SchedulerProfileId, value.clone()),
                ),
                _ => Err(SaiError::internal(format!(
                    "scheduler attached to {:?}",
                    object
                ))),
            };
            result.map_err(|e| {
                error_log!(SaiApi::Scheduler, scheduler = ?scheduler_id, object = ?object, error = %e, "propagating scheduler change failed");
                e
            })?;
        }
        Ok(())
    }

    pub fn get_scheduler_attribute(
        &self,
        scheduler_id: Handle,
        attrs: &mut [Attribute<SchedulerAttr>],
    ) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let record = ctx.schedulers.get(profile_id(ctx, scheduler_id)?)?;
        for attr in attrs.iter_mut() {
            attr.value = record.value_of(attr.id);
        }
        Ok(())
    }
}
