//! Core configuration.
//!
//! # Responsibility
//! - Hold tunables shared by booking and currency services.
//! - Load them from TOML with defaults for every missing key.
//!
//! # Invariants
//! - `base_currency` is a 3-letter uppercase code.
//! - `1 <= default_page_limit <= max_page_limit`.

use crate::model::booking::{is_currency_code, normalize_currency};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_CURRENCY: &str = "EUR";
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_RATE_TTL_SECS: u64 = 3600;

/// Tunables for travel core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Default booking currency and pivot for two-hop conversions.
    pub base_currency: String,
    /// Page size used when callers pass `limit = 0`.
    pub default_page_limit: u32,
    /// Upper bound applied to caller-provided page sizes.
    pub max_page_limit: u32,
    /// Age after which exchange rates are reported stale.
    pub rate_ttl_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
            rate_ttl_secs: DEFAULT_RATE_TTL_SECS,
        }
    }
}

impl CoreConfig {
    /// Parses a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(source).map_err(ConfigError::Parse)?;
        config.base_currency = normalize_currency(&config.base_currency);
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_currency_code(&self.base_currency) {
            return Err(ConfigError::Invalid(format!(
                "base_currency must be a 3-letter code, got `{}`",
                self.base_currency
            )));
        }
        if self.default_page_limit == 0 || self.max_page_limit == 0 {
            return Err(ConfigError::Invalid(
                "page limits must be at least 1".to_string(),
            ));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(ConfigError::Invalid(format!(
                "default_page_limit {} exceeds max_page_limit {}",
                self.default_page_limit, self.max_page_limit
            )));
        }
        Ok(())
    }

    pub fn rate_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_ttl_secs)
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
