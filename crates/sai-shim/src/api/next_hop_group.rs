//! Next-hop groups (ECMP).
//!
//! A group handle's value is the SDK ECMP id; member next-hop handles carry
//! SDK egress ids. The shim keeps no table of its own.

use crate::attr::{attr_ids, check_get_list, find, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::sdk::SwitchSdk;
use crate::switch::{expect_type, SaiSwitch};

attr_ids! {
    pub enum NextHopGroupAttr {
        NextHopCount => "SAI_NEXT_HOP_GROUP_ATTR_NEXT_HOP_COUNT",
        Type => "SAI_NEXT_HOP_GROUP_ATTR_TYPE",
        NextHopList => "SAI_NEXT_HOP_GROUP_ATTR_NEXT_HOP_LIST",
    }
}

/// `sai_next_hop_group_type_t`. Only ECMP exists.
pub const NEXT_HOP_GROUP_TYPE_ECMP: i32 = 0;

fn egress_ids(next_hops: &[Handle]) -> SaiResult<Vec<u32>> {
    if next_hops.is_empty() {
        return Err(SaiError::invalid_parameter("empty next hop list"));
    }
    next_hops
        .iter()
        .map(|h| expect_type(*h, ObjectType::NextHop))
        .collect()
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn create_next_hop_group(&mut self, attrs: &[Attribute<NextHopGroupAttr>]) -> SaiResult<Handle> {
        let (sdk, _) = self.parts_mut()?;

        let group_type = find(attrs, NextHopGroupAttr::Type)
            .ok_or(SaiError::MandatoryAttributeMissing {
                attribute: "SAI_NEXT_HOP_GROUP_ATTR_TYPE",
            })?
            .as_s32()?;
        if group_type != NEXT_HOP_GROUP_TYPE_ECMP {
            return Err(SaiError::not_implemented(format!("next hop group type {}", group_type)));
        }
        let list = find(attrs, NextHopGroupAttr::NextHopList).ok_or(
            SaiError::MandatoryAttributeMissing {
                attribute: "SAI_NEXT_HOP_GROUP_ATTR_NEXT_HOP_LIST",
            },
        )?;
        let members = egress_ids(list.as_oid_list()?)?;

        let ecmp = sdk.l3_ecmp_create(&members).map_err(|e| {
            error_log!(SaiApi::NextHopGroup, members = ?members, error = %e, "ECMP create failed");
            SaiError::sdk("l3_ecmp_create")(e)
        })?;
        info_log!(SaiApi::NextHopGroup, ecmp, count = members.len(), "next hop group created");
        Ok(Handle::encode(ObjectType::NextHopGroup, ecmp))
    }

    pub fn remove_next_hop_group(&mut self, group_id: Handle) -> SaiResult<()> {
        let (sdk, _) = self.parts_mut()?;
        let ecmp = expect_type(group_id, ObjectType::NextHopGroup)?;
        sdk.l3_ecmp_destroy(ecmp)
            .map_err(SaiError::sdk("l3_ecmp_destroy"))?;
        info_log!(SaiApi::NextHopGroup, ecmp, "next hop group removed");
        Ok(())
    }

    /// Adds members one by one, stopping at the first SDK failure.
    pub fn add_next_hop_to_group(&mut self, group_id: Handle, next_hops: &[Handle]) -> SaiResult<()> {
        let (sdk, _) = self.parts_mut()?;
        let ecmp = expect_type(group_id, ObjectType::NextHopGroup)?;
        for egress in egress_ids(next_hops)? {
            sdk.l3_ecmp_add(ecmp, egress)
                .map_err(SaiError::sdk("l3_ecmp_add"))?;
        }
        debug_log!(SaiApi::NextHopGroup, ecmp, added = next_hops.len(), "next hops added");
        Ok(())
    }

    pub fn remove_next_hop_from_group(&mut self, group_id: Handle, next_hops: &[Handle]) -> SaiResult<()> {
        let (sdk, _) = self.parts_mut()?;
        let ecmp = expect_type(group_id, ObjectType::NextHopGroup)?;
        for egress in egress_ids(next_hops)? {
            sdk.l3_ecmp_delete(ecmp, egress)
                .map_err(SaiError::sdk("l3_ecmp_delete"))?;
        }
        debug_log!(SaiApi::NextHopGroup, ecmp, removed = next_hops.len(), "next hops removed");
        Ok(())
    }

    pub fn set_next_hop_group_attribute(
        &mut self,
        _group_id: Handle,
        attr: &Attribute<NextHopGroupAttr>,
    ) -> SaiResult<()> {
        self.context()?;
        Err(SaiError::not_implemented(format!("next hop group set {:?}", attr.id)))
    }

    pub fn get_next_hop_group_attribute(
        &self,
        group_id: Handle,
        attrs: &mut [Attribute<NextHopGroupAttr>],
    ) -> SaiResult<()> {
        self.context()?;
        check_get_list(attrs)?;
        let ecmp = expect_type(group_id, ObjectType::NextHopGroup)?;
        let members = self
            .sdk()
            .l3_ecmp_get(ecmp)
            .map_err(SaiError::sdk("l3_ecmp_get"))?;

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                NextHopGroupAttr::Type => AttributeValue::S32(NEXT_HOP_GROUP_TYPE_ECMP),
                NextHopGroupAttr::NextHopCount => AttributeValue::U32(members.len() as u32),
                NextHopGroupAttr::NextHopList => AttributeValue::OidList(
                    members
                        .iter()
                        .map(|m| Handle::encode(ObjectType::NextHop, *m))
                        .collect(),
                ),
            };
        }
        Ok(())
    }
}
