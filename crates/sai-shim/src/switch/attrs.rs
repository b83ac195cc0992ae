//! Switch attributes.

use crate::attr::{attr_ids, check_get_list, AttrId, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType};
use crate::logging::SaiApi;
use crate::notify::SwitchOperStatus;
use crate::sdk::{SwitchControl, SwitchSdk};

use super::SaiSwitch;

/// SDK hash selector values for `EcmpHashConfig`.
const SDK_HASH_XOR: u32 = 1;
const SDK_HASH_CRC: u32 = 8;

attr_ids! {
    pub enum SwitchAttr {
        PortNumber => "SAI_SWITCH_ATTR_PORT_NUMBER",
        PortList => "SAI_SWITCH_ATTR_PORT_LIST",
        CpuPort => "SAI_SWITCH_ATTR_CPU_PORT",
        MaxVirtualRouters => "SAI_SWITCH_ATTR_MAX_VIRTUAL_ROUTERS",
        FdbTableSize => "SAI_SWITCH_ATTR_FDB_TABLE_SIZE",
        OnLinkRouteSupported => "SAI_SWITCH_ATTR_ON_LINK_ROUTE_SUPPORTED",
        OperStatus => "SAI_SWITCH_ATTR_OPER_STATUS",
        MaxTemp => "SAI_SWITCH_ATTR_MAX_TEMP",
        SwitchingMode => "SAI_SWITCH_ATTR_SWITCHING_MODE",
        BcastCpuFloodEnable => "SAI_SWITCH_ATTR_BCAST_CPU_FLOOD_ENABLE",
        McastCpuFloodEnable => "SAI_SWITCH_ATTR_MCAST_CPU_FLOOD_ENABLE",
        SrcMacAddress => "SAI_SWITCH_ATTR_SRC_MAC_ADDRESS",
        MaxLearnedAddresses => "SAI_SWITCH_ATTR_MAX_LEARNED_ADDRESSES",
        FdbAgingTime => "SAI_SWITCH_ATTR_FDB_AGING_TIME",
        FdbUnicastMissAction => "SAI_SWITCH_ATTR_FDB_UNICAST_MISS_ACTION",
        FdbBroadcastMissAction => "SAI_SWITCH_ATTR_FDB_BROADCAST_MISS_ACTION",
        FdbMulticastMissAction => "SAI_SWITCH_ATTR_FDB_MULTICAST_MISS_ACTION",
        ViolationTtl1Action => "SAI_SWITCH_ATTR_VIOLATION_TTL1_ACTION",
        EcmpHashSeed => "SAI_SWITCH_ATTR_ECMP_HASH_SEED",
        EcmpHashAlgorithm => "SAI_SWITCH_ATTR_ECMP_HASH_ALGORITHM",
        EcmpMaxPaths => "SAI_SWITCH_ATTR_ECMP_MAX_PATHS",
        PortBreakout => "SAI_SWITCH_ATTR_PORT_BREAKOUT",
        CounterRefreshInterval => "SAI_SWITCH_ATTR_COUNTER_REFRESH_INTERVAL",
    }
}

/// `sai_hash_algorithm_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Crc = 0,
    Xor = 1,
    Random = 2,
}

impl HashAlgorithm {
    pub fn from_s32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(HashAlgorithm::Crc),
            1 => Some(HashAlgorithm::Xor),
            2 => Some(HashAlgorithm::Random),
            _ => None,
        }
    }
}

/// Last values written through set, reported back by get.
#[derive(Debug, Clone, Default)]
pub struct SwitchAttrState {
    pub fdb_aging_time: u32,
    pub ecmp_hash_seed: u32,
    pub ecmp_hash_algorithm: HashAlgorithm,
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn set_switch_attribute(&mut self, attr: &Attribute<SwitchAttr>) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        match attr.id {
            SwitchAttr::PortNumber
            | SwitchAttr::PortList
            | SwitchAttr::CpuPort
            | SwitchAttr::MaxVirtualRouters
            | SwitchAttr::FdbTableSize
            | SwitchAttr::OnLinkRouteSupported
            | SwitchAttr::OperStatus
            | SwitchAttr::MaxTemp => {
                warn_log!(SaiApi::Switch, attr = ?attr.id, "set on read-only switch attribute");
                Err(SaiError::invalid_parameter(format!(
                    "{} is read-only",
                    attr.id.name()
                )))
            }
            SwitchAttr::SrcMacAddress => {
                let mac = attr.as_mac()?;
                ctx.system_mac = mac;
                info_log!(SaiApi::Switch, mac = %mac, "system MAC set");
                Ok(())
            }
            SwitchAttr::FdbAgingTime => {
                let seconds = attr.as_u32()?;
                sdk.l2_age_timer_set(seconds)
                    .map_err(SaiError::sdk("l2_age_timer_set"))?;
                ctx.switch_attrs.fdb_aging_time = seconds;
                Ok(())
            }
            SwitchAttr::EcmpHashSeed => {
                let seed = attr.as_u32()?;
                sdk.switch_control_set(SwitchControl::EcmpHashSeed, seed)
                    .map_err(SaiError::sdk("switch_control_set"))?;
                ctx.switch_attrs.ecmp_hash_seed = seed;
                Ok(())
            }
            SwitchAttr::EcmpHashAlgorithm => {
                let raw = attr.as_s32()?;
                let algorithm = HashAlgorithm::from_s32(raw).ok_or_else(|| {
                    SaiError::invalid_parameter(format!("unknown hash algorithm {}", raw))
                })?;
                let sdk_value = match algorithm {
                    HashAlgorithm::Random => {
                        return Err(SaiError::not_supported("random ECMP hash"));
                    }
                    HashAlgorithm::Crc => SDK_HASH_CRC,
                    HashAlgorithm::Xor => SDK_HASH_XOR,
                };
                sdk.switch_control_set(SwitchControl::EcmpHashConfig, sdk_value)
                    .map_err(SaiError::sdk("switch_control_set"))?;
                ctx.switch_attrs.ecmp_hash_algorithm = algorithm;
                Ok(())
            }
            SwitchAttr::SwitchingMode
            | SwitchAttr::BcastCpuFloodEnable
            | SwitchAttr::McastCpuFloodEnable
            | SwitchAttr::MaxLearnedAddresses
            | SwitchAttr::FdbUnicastMissAction
            | SwitchAttr::FdbBroadcastMissAction
            | SwitchAttr::FdbMulticastMissAction
            | SwitchAttr::ViolationTtl1Action
            | SwitchAttr::EcmpMaxPaths
            | SwitchAttr::PortBreakout
            | SwitchAttr::CounterRefreshInterval => Err(SaiError::not_supported(
                attr.id.name(),
            )),
        }
    }

    pub fn get_switch_attribute(&self, attrs: &mut [Attribute<SwitchAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                SwitchAttr::PortNumber => {
                    AttributeValue::U32(ctx.capabilities.ports.len() as u32)
                }
                SwitchAttr::PortList => AttributeValue::OidList(
                    ctx.capabilities
                        .ports
                        .iter()
                        .map(|&p| Handle::encode(ObjectType::Port, p))
                        .collect(),
                ),
                SwitchAttr::CpuPort => {
                    AttributeValue::Oid(Handle::encode(ObjectType::Port, ctx.capabilities.cpu_port))
                }
                SwitchAttr::MaxVirtualRouters => AttributeValue::U32(ctx.capabilities.max_vrf),
                SwitchAttr::SrcMacAddress => AttributeValue::Mac(ctx.system_mac),
                SwitchAttr::FdbAgingTime => AttributeValue::U32(ctx.switch_attrs.fdb_aging_time),
                SwitchAttr::EcmpHashSeed => AttributeValue::U32(ctx.switch_attrs.ecmp_hash_seed),
                SwitchAttr::EcmpHashAlgorithm => {
                    AttributeValue::S32(ctx.switch_attrs.ecmp_hash_algorithm as i32)
                }
                SwitchAttr::OperStatus => AttributeValue::S32(SwitchOperStatus::Up as i32),
                other => {
                    return Err(SaiError::not_supported(other.name()));
                }
            };
        }
        Ok(())
    }
}
