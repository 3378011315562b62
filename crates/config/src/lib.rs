//! Configuration loading and validation for Panelwire.
//!
//! Loads client settings from `~/.panelwire/config.toml` with environment
//! variable overrides. The resulting [`ClientConfig`] is an immutable value
//! passed explicitly to the client; there is no process-wide default.
//!
//! | field            | default   |
//! |------------------|-----------|
//! | `name_format`    | `none`    |
//! | `ip_handling`    | `none`    |
//! | `data_residency` | `default` |
//! | `timeout_secs`   | `30`      |
//! | `strict_batches` | `false`   |
//! | `api_host`       | unset     |

use panelwire_core::NameFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default ingestion host.
pub const DEFAULT_HOST: &str = "https://api.mixpanel.com";

/// EU data-residency ingestion host.
pub const EU_HOST: &str = "https://api-eu.mixpanel.com";

/// The root configuration structure.
///
/// Maps directly to `~/.panelwire/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How user property names are rewritten
    #[serde(default)]
    pub name_format: NameFormat,

    /// Whether the server should geolocate from the request IP
    #[serde(default)]
    pub ip_handling: IpHandling,

    /// Which regional host receives the data
    #[serde(default)]
    pub data_residency: DataResidency,

    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fail a whole batch build when any message fails, instead of skipping it
    #[serde(default)]
    pub strict_batches: bool,

    /// Override the ingestion host entirely (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Request-IP handling, sent as the `ip` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpHandling {
    /// No `ip` parameter; the server default applies.
    #[default]
    None,
    /// `ip=1`: geolocate from the request IP.
    UseRequestIp,
    /// `ip=0`: never use the request IP.
    IgnoreRequestIp,
}

impl IpHandling {
    /// The query string suffix for this mode, including `?`.
    pub fn query(self) -> &'static str {
        match self {
            Self::None => "",
            Self::UseRequestIp => "?ip=1",
            Self::IgnoreRequestIp => "?ip=0",
        }
    }
}

impl std::str::FromStr for IpHandling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" | "" => Ok(Self::None),
            "use_request_ip" | "use" => Ok(Self::UseRequestIp),
            "ignore_request_ip" | "ignore" => Ok(Self::IgnoreRequestIp),
            other => Err(format!("unknown ip handling mode: {other}")),
        }
    }
}

/// Data-residency region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataResidency {
    #[default]
    Default,
    Eu,
}

impl DataResidency {
    pub fn host(self) -> &'static str {
        match self {
            Self::Default => DEFAULT_HOST,
            Self::Eu => EU_HOST,
        }
    }
}

impl std::str::FromStr for DataResidency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "us" | "" => Ok(Self::Default),
            "eu" => Ok(Self::Eu),
            other => Err(format!("unknown data residency: {other}")),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default path (~/.panelwire/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PANELWIRE_NAME_FORMAT`
    /// - `PANELWIRE_IP_HANDLING`
    /// - `PANELWIRE_DATA_RESIDENCY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(format) = lookup("PANELWIRE_NAME_FORMAT") {
            self.name_format = format.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Some(mode) = lookup("PANELWIRE_IP_HANDLING") {
            self.ip_handling = mode.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Some(residency) = lookup("PANELWIRE_DATA_RESIDENCY") {
            self.data_residency = residency.parse().map_err(ConfigError::ValidationError)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".panelwire")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be between 1 and 300".into(),
            ));
        }

        if let Some(host) = &self.api_host
            && !host.starts_with("http://")
            && !host.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "api_host must start with http:// or https://".into(),
            ));
        }

        Ok(())
    }

    /// The ingestion host, honoring an explicit override.
    pub fn host(&self) -> &str {
        self.api_host
            .as_deref()
            .map(|h| h.trim_end_matches('/'))
            .unwrap_or_else(|| self.data_residency.host())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name_format: NameFormat::None,
            ip_handling: IpHandling::None,
            data_residency: DataResidency::Default,
            timeout_secs: default_timeout_secs(),
            strict_batches: false,
            api_host: None,
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
