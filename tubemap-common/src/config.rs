//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (applied by the binary through clap)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: the service logs a warning and
//! starts on defaults. A config file that exists but cannot be parsed is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Config file name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "tubemap.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the `vg` binary
    #[serde(default = "default_vg_path")]
    pub vg_path: PathBuf,

    /// Externally managed reference-data directory
    #[serde(default = "default_mounted_data_dir")]
    pub mounted_data_dir: PathBuf,

    /// Reference data shipped with the service
    #[serde(default = "default_internal_data_dir")]
    pub internal_data_dir: PathBuf,

    /// Root under which each request gets its own working directory
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Upper bound on a single external tool invocation, in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Pipelines allowed to run external tools at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_vg_path() -> PathBuf {
    PathBuf::from("./vg/vg")
}

fn default_mounted_data_dir() -> PathBuf {
    PathBuf::from("./mountedData/")
}

fn default_internal_data_dir() -> PathBuf {
    PathBuf::from("./internalData/")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("tubemap-server")
}

fn default_tool_timeout_secs() -> u64 {
    300
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            vg_path: default_vg_path(),
            mounted_data_dir: default_mounted_data_dir(),
            internal_data_dir: default_internal_data_dir(),
            work_dir: default_work_dir(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// With an explicit path the file must exist and parse. Without one the
    /// local `tubemap.toml` and then the per-user config file are tried; if
    /// neither exists the compiled defaults are returned.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        match locate_config_file() {
            Some(path) => Self::load_file(&path),
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(Error::Config(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(Error::Config(
                "tool_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout applied to every external tool invocation
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Find the config file to use when none was given explicitly
///
/// `./tubemap.toml` first, then `<config dir>/tubemap/config.toml`.
fn locate_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("tubemap").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_deployment() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.vg_path, PathBuf::from("./vg/vg"));
        assert_eq!(config.mounted_data_dir, PathBuf::from("./mountedData/"));
        assert_eq!(config.internal_data_dir, PathBuf::from("./internalData/"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.tool_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 8080
            vg_path = "/usr/local/bin/vg"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.vg_path, PathBuf::from("/usr/local/bin/vg"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = TomlConfig::from_toml_str("max_concurrent_jobs = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
