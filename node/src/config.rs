//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use oracle_sectors::{EntityTypeConfig, SectorPolicy};
use oracle_types::{Address, EntityType, OracleParams, SectorId};
use oracle_validation::OracleSettings;

use crate::logging::LogFormat;
use crate::NodeError;

/// File name of the engine snapshot inside `data_dir`.
pub const SNAPSHOT_FILE: &str = "oracle.snapshot";

/// Configuration for a Quality Oracle node.
///
/// Can be loaded from a TOML file via [`OracleNodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OracleNodeConfig {
    /// Directory holding the engine snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How often pending validations are checked for an elapsed voting window.
    #[serde(default = "default_timeout_scan_interval_secs")]
    pub timeout_scan_interval_secs: u64,

    /// How often the engine snapshot is written to disk.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Hex-encoded 32-byte root of every cohort draw.
    #[serde(default = "default_selection_seed")]
    pub selection_seed: String,

    /// Addresses allowed to review and resolve disputes.
    #[serde(default)]
    pub arbitrators: Vec<String>,

    /// Tunable engine constants.
    #[serde(default)]
    pub params: OracleParams,

    /// Sectors published on first start. Ignored once a snapshot exists.
    #[serde(default)]
    pub sectors: Vec<SectorSeed>,

    /// Free balances credited to the built-in ledger on first start.
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountSeed {
    pub address: String,
    pub balance: u64,
}

/// A sector and its entity-type policies, as written in the config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorSeed {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub min_validator_stake: u64,
    #[serde(default)]
    pub entity_types: Vec<EntityTypeSeed>,
}

/// Overrides on top of [`EntityTypeConfig::defaults_for`]. Unset fields keep
/// the category default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeSeed {
    pub entity_type: EntityType,
    pub quality_threshold: Option<u8>,
    pub required_collateral: Option<u64>,
    pub validation_fee: Option<u64>,
    pub quorum_size: Option<u32>,
    pub dispute_timeout_days: Option<u32>,
    pub voting_window_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./oracle_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_scan_interval_secs() -> u64 {
    60
}

fn default_snapshot_interval_secs() -> u64 {
    300
}

fn default_selection_seed() -> String {
    hex::encode([0u8; 32])
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl OracleNodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn selection_seed(&self) -> Result<[u8; 32], NodeError> {
        let bytes = hex::decode(self.selection_seed.trim())
            .map_err(|e| NodeError::Config(format!("selection_seed: {e}")))?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            NodeError::Config(format!(
                "selection_seed must be 32 bytes, got {}",
                bytes.len()
            ))
        })
    }

    /// Engine settings derived from this config.
    pub fn oracle_settings(&self) -> Result<OracleSettings, NodeError> {
        self.params.validate().map_err(NodeError::Config)?;
        let arbitrators = self
            .arbitrators
            .iter()
            .map(|raw| {
                let address = Address::new(raw.as_str());
                if address.is_valid() {
                    Ok(address)
                } else {
                    Err(NodeError::Config(format!("invalid arbitrator address {raw:?}")))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OracleSettings {
            params: self.params.clone(),
            selection_seed: self.selection_seed()?,
            arbitrators,
        })
    }

    /// Check everything that can be checked without touching disk.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        self.oracle_settings()?;
        if self.timeout_scan_interval_secs == 0 || self.snapshot_interval_secs == 0 {
            return Err(NodeError::Config("task intervals must be positive".into()));
        }
        for account in &self.accounts {
            if !Address::new(account.address.as_str()).is_valid() {
                return Err(NodeError::Config(format!(
                    "invalid account address {:?}",
                    account.address
                )));
            }
        }
        for sector in &self.sectors {
            for config in sector.entity_type_configs() {
                config
                    .validate()
                    .map_err(|e| NodeError::Config(format!("sector {}: {e}", sector.id)))?;
            }
        }
        Ok(())
    }
}

impl SectorSeed {
    pub fn policy(&self) -> SectorPolicy {
        let mut policy = SectorPolicy::new(self.id.as_str(), self.min_validator_stake as u128);
        if !self.name.is_empty() {
            policy.name = self.name.clone();
        }
        policy
    }

    pub fn entity_type_configs(&self) -> Vec<EntityTypeConfig> {
        self.entity_types
            .iter()
            .map(|seed| seed.config(SectorId::new(self.id.as_str())))
            .collect()
    }
}

impl EntityTypeSeed {
    pub fn config(&self, sector: SectorId) -> EntityTypeConfig {
        let defaults = EntityTypeConfig::defaults_for(sector, self.entity_type);
        EntityTypeConfig {
            quality_threshold: self.quality_threshold.unwrap_or(defaults.quality_threshold),
            required_collateral: self
                .required_collateral
                .map_or(defaults.required_collateral, u128::from),
            validation_fee: self
                .validation_fee
                .map_or(defaults.validation_fee, u128::from),
            quorum_size: self.quorum_size.unwrap_or(defaults.quorum_size),
            dispute_timeout_days: self
                .dispute_timeout_days
                .unwrap_or(defaults.dispute_timeout_days),
            voting_window_secs: self.voting_window_secs.unwrap_or(defaults.voting_window_secs),
            active: self.active,
            ..defaults
        }
    }
}

impl Default for OracleNodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            timeout_scan_interval_secs: default_timeout_scan_interval_secs(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            selection_seed: default_selection_seed(),
            arbitrators: Vec::new(),
            params: OracleParams::default(),
            sectors: Vec::new(),
            accounts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        data_dir = "/var/lib/oracle"
        log_format = "json"
        arbitrators = ["arb-1", "arb-2"]
        selection_seed = "0101010101010101010101010101010101010101010101010101010101010101"

        [params]
        slash_bps = 2000

        [[accounts]]
        address = "validator-1"
        balance = 5000

        [[sectors]]
        id = "market"
        name = "Marketplace"
        min_validator_stake = 1000

        [[sectors.entity_types]]
        entity_type = "product"
        quorum_size = 7
        validation_fee = 40

        [[sectors.entity_types]]
        entity_type = "post"
        active = false
    "#;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = OracleNodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = OracleNodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = OracleNodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.timeout_scan_interval_secs, 60);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.params, OracleParams::default());
        assert_eq!(config.selection_seed().unwrap(), [0u8; 32]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sector_seeds_override_category_defaults() {
        let config = OracleNodeConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.params.slash_bps, 2_000);
        assert_eq!(config.params.slash_redistribution_bps, 10_000);
        assert_eq!(config.snapshot_path(), PathBuf::from("/var/lib/oracle/oracle.snapshot"));

        let sector = &config.sectors[0];
        assert_eq!(sector.policy().min_validator_stake, 1_000);
        assert_eq!(sector.policy().name, "Marketplace");
        let configs = sector.entity_type_configs();
        assert_eq!(configs[0].quorum_size, 7);
        assert_eq!(configs[0].validation_fee, 40);
        let product_defaults = EntityTypeConfig::defaults_for(SectorId::from("market"), EntityType::Product);
        assert_eq!(configs[0].required_collateral, product_defaults.required_collateral);
        assert!(!configs[1].active);

        let settings = config.oracle_settings().unwrap();
        assert_eq!(settings.selection_seed, [1u8; 32]);
        assert_eq!(settings.arbitrators.len(), 2);
        assert_eq!(config.accounts[0].balance, 5_000);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let short_seed = OracleNodeConfig {
            selection_seed: "abcd".into(),
            ..OracleNodeConfig::default()
        };
        assert!(matches!(short_seed.validate(), Err(NodeError::Config(_))));

        let bad_format = OracleNodeConfig {
            log_format: "xml".into(),
            ..OracleNodeConfig::default()
        };
        assert!(matches!(bad_format.validate(), Err(NodeError::Config(_))));

        let even = OracleNodeConfig::from_toml_str(
            r#"
            [[sectors]]
            id = "s"
            min_validator_stake = 1
            [[sectors.entity_types]]
            entity_type = "nft"
            quorum_size = 4
            "#,
        )
        .unwrap();
        assert!(matches!(even.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = OracleNodeConfig::from_toml_file("/nonexistent/oracle.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
