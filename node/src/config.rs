//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use quest_types::{Address, ProtocolParams};

use crate::NodeError;

/// Configuration for a QUEST node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for engine snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Protocol parameters (distribution weights, thresholds).
    #[serde(default)]
    pub params: ProtocolParams,

    /// The administrative identity every gated entry point checks against.
    #[serde(default = "default_admin")]
    pub admin_address: Address,

    /// The treasury identity the platform bucket is credited to.
    #[serde(default = "default_platform")]
    pub platform_address: Address,

    /// Component identity of the Task Registry, used to authorize its
    /// calls into the gateway and the settlement engine.
    #[serde(default = "default_registry")]
    pub registry_address: Address,

    /// Component identity of the Verification Gateway, used to authorize
    /// its verdict relays into the registry.
    #[serde(default = "default_gateway")]
    pub gateway_address: Address,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./quest_data")
}

fn default_admin() -> Address {
    Address::new("qst_admin")
}

fn default_platform() -> Address {
    Address::new("qst_platform_treasury")
}

fn default_registry() -> Address {
    Address::new("qst_component_registry")
}

fn default_gateway() -> Address {
    Address::new("qst_component_gateway")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        // Serde defaults are the single source of truth; an empty TOML
        // document produces the default config.
        toml::from_str("").expect("empty config must deserialize")
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check identity well-formedness and parameter consistency.
    pub fn validate(&self) -> Result<(), NodeError> {
        for (name, addr) in [
            ("admin_address", &self.admin_address),
            ("platform_address", &self.platform_address),
            ("registry_address", &self.registry_address),
            ("gateway_address", &self.gateway_address),
        ] {
            if !addr.is_valid() {
                return Err(NodeError::Config(format!("{name} is not a valid address")));
            }
        }
        self.params
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: NodeConfig = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.admin_address, Address::new("qst_admin"));
        assert_eq!(config.params.participant_share_bps, 6000);
        assert!(!config.enable_metrics);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"
admin_address = "qst_ops_team"
enable_metrics = true

[params]
participant_share_bps = 7000
direct_referrer_share_bps = 1500
indirect_referrer_share_bps = 1000
platform_fee_bps = 500
indirect_tiers = 2
default_min_score = 40
"#
        )
        .unwrap();

        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.admin_address, Address::new("qst_ops_team"));
        assert!(config.enable_metrics);
        assert_eq!(config.params.participant_share_bps, 7000);
        // Untouched fields fall back to defaults.
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn inconsistent_params_in_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[params]
participant_share_bps = 6000
direct_referrer_share_bps = 2500
indirect_referrer_share_bps = 1500
platform_fee_bps = 1000
indirect_tiers = 2
default_min_score = 50
"#
        )
        .unwrap();

        let result = NodeConfig::from_toml_file(file.path());
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn malformed_address_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"admin_address = "not-an-address""#).unwrap();
        let result = NodeConfig::from_toml_file(file.path());
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
