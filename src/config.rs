//! Configuration module for netool

use crate::network::host_probe::HostProbeKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ports scanned by `port` when no specification is given
pub const DEFAULT_PORT_SPEC: &str = "1-1023,3389";

/// Name of the per-user configuration file in the home directory
pub const CONFIG_FILE_NAME: &str = ".netool.toml";

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of concurrent workers per scan
    pub concurrency: usize,

    /// Timeout for each host reachability probe in milliseconds
    pub host_timeout_ms: u64,

    /// Timeout for each TCP connect attempt in milliseconds
    pub port_timeout_ms: u64,

    /// Capacity of the result channel between workers and the aggregator
    pub result_buffer: usize,

    /// Largest number of host addresses a CIDR block may expand to
    pub max_hosts: u64,

    /// Strategy used to decide whether a host is alive
    pub host_probe: HostProbeKind,

    /// Port specification used when the caller gives none
    pub default_ports: String,

    /// IANA service-names CSV used to name open ports
    pub services_file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 100,
            host_timeout_ms: 500,
            port_timeout_ms: 300,
            result_buffer: 10,
            max_hosts: 65_536,
            host_probe: HostProbeKind::Ping,
            default_ports: DEFAULT_PORT_SPEC.to_string(),
            services_file: None,
        }
    }
}

impl ScanConfig {
    /// Set the number of workers
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set both probe timeouts
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.host_timeout_ms = timeout_ms;
        self.port_timeout_ms = timeout_ms;
        self
    }

    /// Set the host probing strategy
    pub fn with_host_probe(mut self, kind: HostProbeKind) -> Self {
        self.host_probe = kind;
        self
    }

    pub fn with_services_file(mut self, path: PathBuf) -> Self {
        self.services_file = Some(path);
        self
    }

    /// Host probe timeout as Duration
    pub fn host_timeout(&self) -> Duration {
        Duration::from_millis(self.host_timeout_ms)
    }

    /// Port probe timeout as Duration
    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            crate::ScanError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: ScanConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from `~/.netool.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let user_config = home_dir.join(CONFIG_FILE_NAME);

        if user_config.exists() {
            match Self::from_toml_file(&user_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", user_config.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Ignoring {}: {}", user_config.display(), e);
                }
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::ScanError::ConfigError(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.result_buffer == 0 {
            return Err(crate::ScanError::ConfigError(
                "Result buffer must be greater than 0".to_string(),
            ));
        }

        if self.host_timeout_ms == 0 || self.port_timeout_ms == 0 {
            return Err(crate::ScanError::ConfigError(
                "Probe timeouts must be greater than 0".to_string(),
            ));
        }

        crate::utils::port_spec::parse_port_spec(&self.default_ports).map_err(|e| {
            crate::ScanError::ConfigError(format!("default_ports: {}", e))
        })?;

        Ok(())
    }
}
