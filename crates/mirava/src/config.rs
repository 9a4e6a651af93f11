//! Configuration loading

use anyhow::{Context, Result};
use mirava_core::{default_mirror_types, MirrorTypeConfig};
use mirava_proxy::MirrorClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Upstream types and their mirrors
    #[serde(default = "default_mirror_types")]
    pub mirror_types: Vec<MirrorTypeConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Outbound client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            skip_tls_verify: false,
        }
    }
}

impl ClientConfig {
    pub fn to_client_config(&self) -> MirrorClientConfig {
        MirrorClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            skip_tls_verify: self.skip_tls_verify,
        }
    }
}

/// Mirror health configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures before a mirror is taken out of rotation
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Re-admit down mirrors on this interval; 0 disables the task
    #[serde(default)]
    pub recovery_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            recovery_interval_secs: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_failures() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.warn_on_suspicious_values();

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn warn_on_suspicious_values(&self) {
        for mirror_type in &self.mirror_types {
            if mirror_type.mirrors.is_empty() && mirror_type.official_url.is_none() {
                warn!(
                    "Mirror type {} has no mirrors and no official URL; every request will fail",
                    mirror_type.name
                );
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            health: HealthConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            mirror_types: default_mirror_types(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/mirava.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.health.max_failures, 3);
        assert_eq!(config.mirror_types.len(), 2);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[health]
max_failures = 5
recovery_interval_secs = 300

[logging]
format = "json"

[[mirror_types]]
name = "pypi"
official_url = "https://pypi.org/simple"

[[mirror_types.mirrors]]
name = "local"
url = "http://10.0.0.2/simple"
priority = 0

[[mirror_types.mirrors]]
name = "backup"
url = "https://backup.example/simple"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.client.timeout_secs, 60);
        assert_eq!(config.health.max_failures, 5);
        assert_eq!(config.health.recovery_interval_secs, 300);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mirror_types.len(), 1);
        assert_eq!(config.mirror_types[0].mirrors[1].priority, 50);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "server = [").unwrap();
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_client_config_conversion() {
        let client = ClientConfig::default().to_client_config();
        assert_eq!(client.timeout, Duration::from_secs(60));
        assert_eq!(client.connect_timeout, Duration::from_secs(10));
    }
}
