//! Switch profile: the key/value configuration handed to switch initialize.
//!
//! Hosts pass SAI profiles as string pairs (`SAI_INIT_CONFIG_FILE=...`). The
//! recognized keys map to typed fields; everything else is kept in `extra`
//! so vendor-specific keys survive a round trip.

use std::collections::BTreeMap;
use std::path::Path;

use sai_types::MacAddress;
use serde::{Deserialize, Serialize};

pub const KEY_INIT_CONFIG_FILE: &str = "SAI_INIT_CONFIG_FILE";
pub const KEY_BOOT_TYPE: &str = "SAI_BOOT_TYPE";
pub const KEY_SWITCH_MAC: &str = "SAI_SWITCH_MAC";
pub const KEY_NUM_QUEUES: &str = "SAI_NUM_QUEUES_PER_PORT";

const DEFAULT_QUEUES_PER_PORT: u32 = 8;
/// Upper bound for `SAI_NUM_QUEUES_PER_PORT`.
pub const MAX_QUEUES_PER_PORT: u32 = 256;

/// Errors raised while loading a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed profile: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// How the switch was (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootType {
    #[default]
    Cold,
    Warm,
    Fast,
}

impl BootType {
    fn parse(value: &str) -> Result<Self, ProfileError> {
        match value {
            "0" | "cold" => Ok(BootType::Cold),
            "1" | "warm" => Ok(BootType::Warm),
            "2" | "fast" => Ok(BootType::Fast),
            _ => Err(ProfileError::InvalidValue {
                key: KEY_BOOT_TYPE,
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchProfile {
    /// SDK configuration file (chip config, port map).
    #[serde(rename = "SAI_INIT_CONFIG_FILE", skip_serializing_if = "Option::is_none")]
    pub init_config_file: Option<String>,

    #[serde(rename = "SAI_BOOT_TYPE")]
    pub boot_type: BootType,

    /// System MAC used when no SRC_MAC_ADDRESS has been set on the switch.
    #[serde(rename = "SAI_SWITCH_MAC", skip_serializing_if = "Option::is_none")]
    pub switch_mac: Option<MacAddress>,

    /// Overrides the SDK-reported queues per port when set.
    #[serde(rename = "SAI_NUM_QUEUES_PER_PORT", skip_serializing_if = "Option::is_none")]
    pub queues_per_port: Option<u32>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for SwitchProfile {
    fn default() -> Self {
        Self {
            init_config_file: None,
            boot_type: BootType::Cold,
            switch_mac: None,
            queues_per_port: None,
            extra: BTreeMap::new(),
        }
    }
}

impl SwitchProfile {
    /// Builds a profile from raw key/value pairs.
    pub fn from_kvps<I, K, V>(pairs: I) -> Result<Self, ProfileError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut profile = SwitchProfile::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                KEY_INIT_CONFIG_FILE => profile.init_config_file = Some(value.to_string()),
                KEY_BOOT_TYPE => profile.boot_type = BootType::parse(value)?,
                KEY_SWITCH_MAC => {
                    let mac = value.parse().map_err(|_| ProfileError::InvalidValue {
                        key: KEY_SWITCH_MAC,
                        value: value.to_string(),
                    })?;
                    profile.switch_mac = Some(mac);
                }
                KEY_NUM_QUEUES => {
                    let queues = value.parse().map_err(|_| ProfileError::InvalidValue {
                        key: KEY_NUM_QUEUES,
                        value: value.to_string(),
                    })?;
                    profile.queues_per_port = Some(queues);
                    profile.validate()?;
                }
                _ => {
                    profile.extra.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(profile)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let profile: SwitchProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Range checks for values serde cannot express.
    pub fn validate(&self) -> Result<(), ProfileError> {
        match self.queues_per_port {
            Some(n) if n > MAX_QUEUES_PER_PORT => Err(ProfileError::InvalidValue {
                key: KEY_NUM_QUEUES,
                value: n.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Queues per port, falling back to the SDK value and then to 8.
    pub fn queues_per_port_or(&self, sdk_value: u32) -> u32 {
        match (self.queues_per_port, sdk_value) {
            (Some(n), _) if n > 0 => n,
            (_, n) if n > 0 => n,
            _ => DEFAULT_QUEUES_PER_PORT,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_from_kvps() {
        let profile = SwitchProfile::from_kvps([
            ("SAI_INIT_CONFIG_FILE", "/etc/bcm/config.bcm"),
            ("SAI_BOOT_TYPE", "0"),
            ("SAI_SWITCH_MAC", "00:11:22:33:44:55"),
            ("SAI_VENDOR_KNOB", " on "),
        ])
        .unwrap();

        assert_eq!(profile.init_config_file.as_deref(), Some("/etc/bcm/config.bcm"));
        assert_eq!(profile.boot_type, BootType::Cold);
        assert_eq!(
            profile.switch_mac,
            Some(MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
        );
        assert_eq!(profile.get("SAI_VENDOR_KNOB"), Some("on"));
    }

    #[test]
    fn test_from_kvps_rejects_bad_values() {
        let err = SwitchProfile::from_kvps([("SAI_SWITCH_MAC", "nope")]).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { key: KEY_SWITCH_MAC, .. }));

        let err = SwitchProfile::from_kvps([("SAI_BOOT_TYPE", "3")]).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { key: KEY_BOOT_TYPE, .. }));

        let err = SwitchProfile::from_kvps([("SAI_NUM_QUEUES_PER_PORT", "4294967295")]).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { key: KEY_NUM_QUEUES, .. }));
        let err = SwitchProfile::from_json_str(r#"{"SAI_NUM_QUEUES_PER_PORT": 257}"#).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { key: KEY_NUM_QUEUES, .. }));
        assert!(SwitchProfile::from_kvps([("SAI_NUM_QUEUES_PER_PORT", "256")]).is_ok());
    }

    #[test]
    fn test_json_with_extra_keys() {
        let profile = SwitchProfile::from_json_str(
            r#"{"SAI_BOOT_TYPE": "warm", "SAI_NUM_QUEUES_PER_PORT": 4, "hwsku": "AS7712"}"#,
        )
        .unwrap();
        assert_eq!(profile.boot_type, BootType::Warm);
        assert_eq!(profile.queues_per_port_or(8), 4);
        assert_eq!(profile.get("hwsku"), Some("AS7712"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"SAI_SWITCH_MAC": "02:00:00:00:00:01"}}"#).unwrap();

        let profile = SwitchProfile::from_file(file.path()).unwrap();
        assert_eq!(profile.switch_mac.unwrap().to_string(), "02:00:00:00:00:01");

        let missing = SwitchProfile::from_file("/nonexistent/profile.json").unwrap_err();
        assert!(matches!(missing, ProfileError::Io { .. }));
    }

    #[test]
    fn test_queue_fallbacks() {
        let profile = SwitchProfile::default();
        assert_eq!(profile.queues_per_port_or(12), 12);
        assert_eq!(profile.queues_per_port_or(0), 8);
    }
}
