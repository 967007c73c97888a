//! Oracle configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decryption::{OracleIdentity, AUTHORIZATION_DURATION_DAYS};
use crate::ledger::Address;

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_authorization_duration_days() -> u32 {
    AUTHORIZATION_DURATION_DAYS
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Tournament contract the oracle serves
    #[serde(default)]
    pub contract_address: Address,

    /// Identity the oracle signs and publishes as
    #[serde(default)]
    pub oracle_address: Address,

    /// Secret used to sign decryption authorizations
    #[serde(default)]
    pub signing_secret: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Limit for every ledger and decryption-service call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_authorization_duration_days")]
    pub authorization_duration_days: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::default(),
            oracle_address: Address::default(),
            signing_secret: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            authorization_duration_days: default_authorization_duration_days(),
        }
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("contract_address", &self.contract_address)
            .field("oracle_address", &self.oracle_address)
            .field("signing_secret", &"<redacted>")
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("authorization_duration_days", &self.authorization_duration_days)
            .finish()
    }
}

impl OracleConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_address.is_empty() {
            return Err(ConfigError::Validation("contract_address is required".into()));
        }
        if self.oracle_address.is_empty() {
            return Err(ConfigError::Validation("oracle_address is required".into()));
        }
        if self.signing_secret.is_empty() {
            return Err(ConfigError::Validation("signing_secret is required".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation("poll_interval_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be positive".into()));
        }
        if self.authorization_duration_days == 0 {
            return Err(ConfigError::Validation(
                "authorization_duration_days must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn identity(&self) -> OracleIdentity {
        OracleIdentity::new(self.oracle_address.clone(), self.signing_secret.clone())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
