//! Process configuration read from `SJD_*` environment variables.
//!
//! # Responsibility
//! - Resolve database location, pool sizing and logging settings once at
//!   startup.
//!
//! # Invariants
//! - Unset variables fall back to documented defaults.
//! - Set-but-invalid variables are errors, never silently defaulted.

use crate::db::PoolConfig;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SJD_DB_PATH";
pub const ENV_POOL_SIZE: &str = "SJD_POOL_SIZE";
pub const ENV_POOL_TIMEOUT_MS: &str = "SJD_POOL_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "SJD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SJD_LOG_DIR";

const DEFAULT_DB_PATH: &str = "sjd.sqlite3";
const MAX_POOL_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but its value cannot be used.
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { var, value, reason } => {
                write!(f, "invalid {var}=`{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by every entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub pool: PoolConfig,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            pool: PoolConfig::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(value) = read(ENV_POOL_SIZE) {
            config.pool.size = parse_pool_size(&value)?;
        }
        if let Some(value) = read(ENV_POOL_TIMEOUT_MS) {
            config.pool.acquire_timeout = parse_timeout_ms(&value)?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level.to_ascii_lowercase();
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        Ok(config)
    }
}

fn parse_pool_size(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: ENV_POOL_SIZE,
        value: value.to_string(),
        reason,
    };
    let size = value
        .parse::<usize>()
        .map_err(|err| invalid(err.to_string()))?;
    if size == 0 || size > MAX_POOL_SIZE {
        return Err(invalid(format!("expected 1..={MAX_POOL_SIZE}")));
    }
    Ok(size)
}

fn parse_timeout_ms(value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|err| ConfigError::Invalid {
            var: ENV_POOL_TIMEOUT_MS,
            value: value.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_POOL_SIZE};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.pool.size, 4);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn set_variables_override_defaults() {
        let config = config_from(&[
            ("SJD_DB_PATH", "/var/lib/sjd/app.db"),
            ("SJD_POOL_SIZE", "8"),
            ("SJD_POOL_TIMEOUT_MS", "250"),
            ("SJD_LOG_LEVEL", "WARN"),
            ("SJD_LOG_DIR", "/var/log/sjd"),
            ("SJD_UNRELATED", "x"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/sjd/app.db"));
        assert_eq!(config.pool.size, 8);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(250));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/sjd")));
    }

    #[test]
    fn invalid_pool_size_is_rejected_and_blank_is_unset() {
        let err = config_from(&[("SJD_POOL_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == ENV_POOL_SIZE));
        assert!(config_from(&[("SJD_POOL_SIZE", "many")]).is_err());
        assert!(config_from(&[("SJD_POOL_TIMEOUT_MS", "-5")]).is_err());
        assert_eq!(config_from(&[("SJD_POOL_SIZE", "  ")]).unwrap().pool.size, 4);
    }
}
