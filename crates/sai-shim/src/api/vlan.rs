//! VLAN API.
//!
//! VLANs are addressed by their numeric id. The shim mirrors the set of
//! VLANs it created in a [`VlanBitmap`]; router interfaces on ports borrow
//! the highest id not in it.

use sai_types::VlanId;

use crate::attr::{attr_ids, Attribute};
use crate::error::{SaiError, SaiResult};
use crate::handle::Handle;
use crate::logging::SaiApi;
use crate::sdk::SwitchSdk;
use crate::switch::SaiSwitch;

const VLAN_BITMAP_WORDS: usize = 4096 / 64;

/// One bit per VLAN id 0..=4095.
#[derive(Clone, PartialEq, Eq)]
pub struct VlanBitmap {
    words: [u64; VLAN_BITMAP_WORDS],
}

impl std::fmt::Debug for VlanBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlanBitmap")
            .field("count", &self.count())
            .finish()
    }
}

impl VlanBitmap {
    /// Bitmap holding only `default_vlan`.
    pub fn new(default_vlan: u16) -> Self {
        let mut bitmap = Self {
            words: [0; VLAN_BITMAP_WORDS],
        };
        bitmap.set(default_vlan);
        bitmap
    }

    pub fn set(&mut self, vlan: u16) {
        let vlan = vlan as usize & 0xfff;
        self.words[vlan / 64] |= 1 << (vlan % 64);
    }

    pub fn clear(&mut self, vlan: u16) {
        let vlan = vlan as usize & 0xfff;
        self.words[vlan / 64] &= !(1 << (vlan % 64));
    }

    pub fn contains(&self, vlan: u16) -> bool {
        let vlan = vlan as usize & 0xfff;
        self.words[vlan / 64] & (1 << (vlan % 64)) != 0
    }

    pub fn count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Clears everything except `default_vlan`.
    pub fn reset(&mut self, default_vlan: u16) {
        *self = Self::new(default_vlan);
    }

    /// Highest usable id not in use, scanning down from 4094.
    pub fn max_unused(&self) -> Option<u16> {
        (VlanId::MIN..=VlanId::MAX).rev().find(|&v| !self.contains(v))
    }
}

/// `sai_vlan_tagging_mode_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VlanTaggingMode {
    #[default]
    Untagged,
    Tagged,
    PriorityTagged,
}

/// Port membership entry for add/remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanPort {
    pub port_id: Handle,
    pub tagging_mode: VlanTaggingMode,
}

impl VlanPort {
    pub fn new(port_id: Handle, tagging_mode: VlanTaggingMode) -> Self {
        Self {
            port_id,
            tagging_mode,
        }
    }
}

attr_ids! {
    pub enum VlanAttr {
        PortList => "SAI_VLAN_ATTR_PORT_LIST",
        MaxLearnedAddresses => "SAI_VLAN_ATTR_MAX_LEARNED_ADDRESSES",
        StpInstance => "SAI_VLAN_ATTR_STP_INSTANCE",
        LearnDisable => "SAI_VLAN_ATTR_LEARN_DISABLE",
    }
}

/// `sai_vlan_stat_counter_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanStat {
    InOctets,
    InUcastPkts,
    InNonUcastPkts,
    InDiscards,
    InErrors,
    OutOctets,
    OutUcastPkts,
    OutNonUcastPkts,
    OutDiscards,
    OutErrors,
}

fn check_vlan_id(vlan: u16) -> SaiResult<VlanId> {
    VlanId::new(vlan).map_err(|_| {
        warn_log!(SaiApi::Vlan, vlan, "invalid VLAN id");
        SaiError::InvalidVlanId { vlan: vlan.into() }
    })
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_vlan(&mut self, vlan: u16) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let vid = check_vlan_id(vlan)?;
        sdk.vlan_create(vid.as_u16()).map_err(|e| {
            error_log!(SaiApi::Vlan, vlan, error = %e, "VLAN create failed");
            SaiError::sdk("vlan_create")(e)
        })?;
        ctx.vlans.set(vid.as_u16());
        info_log!(SaiApi::Vlan, vlan, "VLAN created");
        Ok(())
    }

    pub fn remove_vlan(&mut self, vlan: u16) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let vid = check_vlan_id(vlan)?;
        if vid.as_u16() == ctx.default_vlan {
            warn_log!(SaiApi::Vlan, vlan, "cannot remove default VLAN");
            return Err(SaiError::invalid_parameter(format!(
                "VLAN {} is the default VLAN",
                vlan
            )));
        }
        sdk.vlan_destroy(vid.as_u16()).map_err(|e| {
            error_log!(SaiApi::Vlan, vlan, error = %e, "VLAN remove failed");
            SaiError::sdk("vlan_destroy")(e)
        })?;
        ctx.vlans.clear(vid.as_u16());
        info_log!(SaiApi::Vlan, vlan, "VLAN removed");
        Ok(())
    }

    pub fn add_ports_to_vlan(&mut self, vlan: u16, ports: &[VlanPort]) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let vid = check_vlan_id(vlan)?;
        if ports.is_empty() {
            return Err(SaiError::invalid_parameter("empty VLAN port list"));
        }
        let mut members = Vec::with_capacity(ports.len());
        let mut untagged = Vec::new();
        for entry in ports {
            let port = ctx.port_from_handle(entry.port_id)?;
            members.push(port);
            if entry.tagging_mode == VlanTaggingMode::Untagged {
                untagged.push(port);
            }
        }
        sdk.vlan_port_add(vid.as_u16(), &members, &untagged)
            .map_err(|e| {
                error_log!(SaiApi::Vlan, vlan, error = %e, "adding ports to VLAN failed");
                SaiError::sdk("vlan_port_add")(e)
            })?;
        debug_log!(SaiApi::Vlan, vlan, ports = ?members, "ports added to VLAN");
        Ok(())
    }

    pub fn remove_ports_from_vlan(&mut self, vlan: u16, ports: &[VlanPort]) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        if ports.is_empty() {
            return Err(SaiError::invalid_parameter("empty VLAN port list"));
        }
        if !ctx.vlans.contains(vlan) {
            warn_log!(SaiApi::Vlan, vlan, "unknown VLAN");
            return Err(SaiError::invalid_parameter(format!("VLAN {} does not exist", vlan)));
        }
        let members = ports
            .iter()
            .map(|entry| ctx.port_from_handle(entry.port_id))
            .collect::<SaiResult<Vec<_>>>()?;
        sdk.vlan_port_remove(vlan, &members).map_err(|e| {
            error_log!(SaiApi::Vlan, vlan, error = %e, "removing ports from VLAN failed");
            SaiError::sdk("vlan_port_remove")(e)
        })?;
        debug_log!(SaiApi::Vlan, vlan, ports = ?members, "ports removed from VLAN");
        Ok(())
    }

    /// Destroys every VLAN except the default one.
    pub fn remove_all_vlans(&mut self) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        sdk.vlan_destroy_all()
            .map_err(SaiError::sdk("vlan_destroy_all"))?;
        let default_vlan = sdk
            .vlan_default_get()
            .map_err(SaiError::sdk("vlan_default_get"))?;
        ctx.default_vlan = default_vlan;
        ctx.vlans.reset(default_vlan);
        info_log!(SaiApi::Vlan, default_vlan, "all VLANs removed");
        Ok(())
    }

    pub fn set_vlan_attribute(&mut self, _vlan: u16, attr: &Attribute<VlanAttr>) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("VLAN set {:?}", attr.id)))
    }

    pub fn get_vlan_attribute(&self, _vlan: u16, _attrs: &mut [Attribute<VlanAttr>]) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented("VLAN get"))
    }

    pub fn get_vlan_stats(&self, _vlan: u16, _counters: &[VlanStat]) -> SaiResult<Vec<u64>> {
        self.context()?;
        Err(SaiError::not_implemented("VLAN stats"))
    }

    /// Highest VLAN id not created through the shim.
    pub fn max_unused_vlan_id(&self) -> SaiResult<Option<u16>> {
        Ok(self.context()?.vlans.max_unused())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::switch;
    use crate::error::SaiStatus;
    use crate::handle::ObjectType;
    use crate::sdk::sim::SdkCall;
    use pretty_assertions::assert_eq;

    fn port(p: u32) -> Handle {
        Handle::encode(ObjectType::Port, p)
    }

    #[test]
    fn test_bitmap_scan() {
        let mut bitmap = VlanBitmap::new(1);
        assert!(bitmap.contains(1));
        assert_eq!(bitmap.max_unused(), Some(4094));

        bitmap.set(4094);
        bitmap.set(4093);
        assert_eq!(bitmap.max_unused(), Some(4092));

        bitmap.clear(4094);
        assert_eq!(bitmap.max_unused(), Some(4094));
        assert_eq!(bitmap.count(), 2);

        bitmap.reset(1);
        assert_eq!(bitmap.count(), 1);
    }

    #[test]
    fn test_bitmap_full() {
        let mut bitmap = VlanBitmap::new(1);
        for v in 1..=4094 {
            bitmap.set(v);
        }
        assert_eq!(bitmap.max_unused(), None);
    }

    #[test]
    fn test_create_and_remove() {
        let mut sw = switch();
        sw.create_vlan(100).unwrap();
        assert!(sw.sdk().vlan_exists(100));
        assert!(sw.context().unwrap().vlans.contains(100));

        assert_eq!(
            sw.create_vlan(100).unwrap_err().status(),
            SaiStatus::ItemAlreadyExists
        );

        sw.remove_vlan(100).unwrap();
        assert!(!sw.sdk().vlan_exists(100));
        assert!(!sw.context().unwrap().vlans.contains(100));
    }

    #[test]
    fn test_vlan_id_validation() {
        let mut sw = switch();
        assert_eq!(sw.create_vlan(0).unwrap_err().status(), SaiStatus::InvalidVlanId);
        assert_eq!(sw.create_vlan(4095).unwrap_err().status(), SaiStatus::InvalidVlanId);
        assert!(sw.sdk().calls().iter().all(|c| !matches!(c, SdkCall::VlanCreate(_))));
    }

    #[test]
    fn test_default_vlan_cannot_be_removed() {
        let mut sw = switch();
        assert_eq!(sw.remove_vlan(1).unwrap_err().status(), SaiStatus::InvalidParameter);
    }

    #[test]
    fn test_port_membership() {
        let mut sw = switch();
        sw.create_vlan(20).unwrap();
        sw.add_ports_to_vlan(
            20,
            &[
                VlanPort::new(port(1), VlanTaggingMode::Untagged),
                VlanPort::new(port(2), VlanTaggingMode::Tagged),
            ],
        )
        .unwrap();

        let members = sw.sdk().vlan_members(20).unwrap();
        assert_eq!(members.ports.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(members.untagged.iter().copied().collect::<Vec<_>>(), vec![1]);

        sw.remove_ports_from_vlan(20, &[VlanPort::new(port(1), VlanTaggingMode::Untagged)])
            .unwrap();
        let members = sw.sdk().vlan_members(20).unwrap();
        assert_eq!(members.ports.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_port_list_validation() {
        let mut sw = switch();
        sw.create_vlan(20).unwrap();
        assert_eq!(
            sw.add_ports_to_vlan(20, &[]).unwrap_err().status(),
            SaiStatus::InvalidParameter
        );
        assert_eq!(
            sw.remove_ports_from_vlan(20, &[]).unwrap_err().status(),
            SaiStatus::InvalidParameter
        );
        assert_eq!(
            sw.remove_ports_from_vlan(30, &[VlanPort::new(port(1), VlanTaggingMode::Tagged)])
                .unwrap_err()
                .status(),
            SaiStatus::InvalidParameter
        );
        assert_eq!(
            sw.add_ports_to_vlan(20, &[VlanPort::new(port(99), VlanTaggingMode::Tagged)])
                .unwrap_err()
                .status(),
            SaiStatus::InvalidPortNumber
        );
    }

    #[test]
    fn test_remove_all() {
        let mut sw = switch();
        sw.create_vlan(10).unwrap();
        sw.create_vlan(11).unwrap();
        sw.remove_all_vlans().unwrap();
        assert!(!sw.sdk().vlan_exists(10));
        assert_eq!(sw.context().unwrap().vlans.count(), 1);
        assert_eq!(sw.max_unused_vlan_id().unwrap(), Some(4094));
    }

    #[test]
    fn test_unimplemented_surface() {
        let mut sw = switch();
        assert_eq!(
            sw.get_vlan_stats(1, &[VlanStat::InOctets]).unwrap_err().status(),
            SaiStatus::NotImplemented
        );
        let attr = Attribute::new(VlanAttr::LearnDisable, crate::attr::AttributeValue::Bool(true));
        assert_eq!(
            sw.set_vlan_attribute(1, &attr).unwrap_err().status(),
            SaiStatus::NotImplemented
        );
    }
}
