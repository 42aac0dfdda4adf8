//! Process-wide options loaded from a YAML file.
//!
//! ```yaml
//! interval: 3600
//! timeout: 60
//! concurrency: 30
//! workspace: /var/lib/netsweep
//! executable-dir: /usr/local/libexec/netsweep
//! defaults:
//!   user: backup
//!   pass: hunter2
//!   method: cisco
//! devices:
//!   - hostname: core1
//!   - hostname: edge1
//!     method: junos
//!     config:
//!       ip: 192.0.2.7
//!       timeout: "120"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::device::{Defaults, DeviceAccess};
use crate::error::ConfigError;
use crate::scheduler::DEFAULT_CONCURRENCY;

/// Everything the binary needs to run rounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// Seconds between round starts; zero runs a single round.
    #[serde(default)]
    pub interval: u64,

    /// Default per-device timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Attempts allowed in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Disable host key checking for every device.
    #[serde(default)]
    pub insecure: bool,

    /// Directory collected configurations are written to.
    #[serde(default = "current_dir")]
    pub workspace: PathBuf,

    /// Base directory for relative external script paths.
    #[serde(default = "current_dir")]
    pub executable_dir: PathBuf,

    /// Fallback credentials and method.
    #[serde(default)]
    pub defaults: DefaultSettings,

    /// The inventory.
    #[serde(default)]
    pub devices: Vec<DeviceAccess>,
}

/// The `defaults` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSettings {
    pub user: Option<String>,
    pub pass: Option<String>,
    pub enable: Option<String>,
    pub method: Option<String>,
}

fn default_timeout() -> f64 {
    60.0
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Options {
    /// Read and validate an options file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate options from YAML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let options: Options = serde_yaml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1".to_string());
        }
        if self.timeout_duration().is_none() {
            return invalid(format!("timeout must be a positive number of seconds, got {}", self.timeout));
        }
        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            if device.hostname.is_empty() {
                return invalid("device with an empty hostname".to_string());
            }
            if !seen.insert(device.hostname.as_str()) {
                return invalid(format!("device {} is listed twice", device.hostname));
            }
        }
        Ok(())
    }

    fn timeout_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.timeout)
            .ok()
            .filter(|d| !d.is_zero())
    }

    /// Time between round starts, or `None` for a single round.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval > 0).then(|| Duration::from_secs(self.interval))
    }

    /// Fallbacks applied while resolving each device.
    pub fn defaults(&self) -> Defaults {
        let base = Defaults::default();
        Defaults {
            user: self.defaults.user.clone(),
            pass: self.defaults.pass.clone(),
            enable: self.defaults.enable.clone(),
            method: self.defaults.method.clone(),
            timeout: self.timeout_duration().unwrap_or(base.timeout),
            insecure: self.insecure,
        }
    }
}
