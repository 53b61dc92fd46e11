//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::onboarding::AgentFlavor;

const DB_PATH_VAR: &str = "AGENT_ONBOARDING_DB_PATH";
const PORT_VAR: &str = "AGENT_ONBOARDING_PORT";
const FLAVOR_VAR: &str = "AGENT_ONBOARDING_FLAVOR";

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Path of the libSQL database holding session checkpoints.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Flavor used when a start request does not name one.
    pub default_flavor: AgentFlavor,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/agent-onboarding.db"),
            port: 8080,
            default_flavor: AgentFlavor::Clmm,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup. Unset variables
    /// fall back to defaults; set but malformed ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: PORT_VAR.to_string(),
                message: format!("{port:?} is not a port number: {e}"),
            })?;
        }

        if let Some(flavor) = lookup(FLAVOR_VAR) {
            config.default_flavor = flavor.trim().parse::<AgentFlavor>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: FLAVOR_VAR.to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }
}
