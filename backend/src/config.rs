//! Runtime configuration.
//!
//! Resolution order, later wins:
//!
//! 1. Built-in defaults
//! 2. JSON config file (`--config` or `RECORDPORT_CONFIG`)
//! 3. Environment: `RECORDPORT_PORT`, `RECORDPORT_STORE_DIR`,
//!    `RECORDPORT_EXPANSION_POLICY` (a `.env` file is honored)
//! 4. CLI flags, applied by the binary
//!
//! ```json
//! {
//!   "port": 3000,
//!   "expansion_policy": "cycle",
//!   "record_types": {
//!     "bookings": {
//!       "required_fields": ["booking_number"],
//!       "schema": { "fields": { "data.equipment_details": "array-of-object" } }
//!     }
//!   }
//! }
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::PolicyKind;
use crate::error::ConfigError;
use crate::schema::RecordSchema;
use crate::store::DEFAULT_STORE_DIR;

pub const ENV_CONFIG: &str = "RECORDPORT_CONFIG";
pub const ENV_PORT: &str = "RECORDPORT_PORT";
pub const ENV_STORE_DIR: &str = "RECORDPORT_STORE_DIR";
pub const ENV_EXPANSION_POLICY: &str = "RECORDPORT_EXPANSION_POLICY";

/// Labels end up in download filenames.
static RECORD_TYPE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("valid label pattern"));

/// Whether `label` may name a record type.
pub fn is_valid_label(label: &str) -> bool {
    RECORD_TYPE_LABEL.is_match(label)
}

/// Settings for one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTypeConfig {
    /// Fields every imported record must carry (dot paths allowed).
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Declared layout; when absent, import infers array columns.
    #[serde(default)]
    pub schema: Option<RecordSchema>,
}

impl RecordTypeConfig {
    pub fn requiring(fields: &[&str]) -> Self {
        Self {
            required_fields: fields.iter().map(|s| s.to_string()).collect(),
            schema: None,
        }
    }
}

/// Codec and server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// HTTP port for `serve`.
    pub port: u16,

    /// Directory of the JSON file store.
    pub store_dir: PathBuf,

    /// How rows are allotted to mismatched array lengths on export.
    pub expansion_policy: PolicyKind,

    /// Known record types, by label.
    pub record_types: BTreeMap<String, RecordTypeConfig>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let mut record_types = BTreeMap::new();
        record_types.insert(
            "shipment_plans".to_string(),
            RecordTypeConfig::requiring(&["name"]),
        );
        record_types.insert(
            "bookings".to_string(),
            RecordTypeConfig::requiring(&["booking_number"]),
        );
        record_types.insert(
            "reference_lists".to_string(),
            RecordTypeConfig::requiring(&["name"]),
        );

        Self {
            port: 3000,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            expansion_policy: PolicyKind::default(),
            record_types,
        }
    }
}

impl CodecConfig {
    /// Load defaults, then the config file (explicit path or
    /// `RECORDPORT_CONFIG`), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(ENV_CONFIG).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT.to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(dir) = lookup(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(policy) = lookup(ENV_EXPANSION_POLICY) {
            self.expansion_policy =
                PolicyKind::parse(&policy).ok_or_else(|| ConfigError::InvalidEnv {
                    name: ENV_EXPANSION_POLICY.to_string(),
                    value: policy.clone(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self
            .record_types
            .keys()
            .find(|label| !is_valid_label(label))
        {
            Some(bad) => Err(ConfigError::InvalidRecordType(bad.clone())),
            None => Ok(()),
        }
    }

    pub fn record_type(&self, label: &str) -> Option<&RecordTypeConfig> {
        self.record_types.get(label)
    }
}
