//! Device descriptors and their per-attempt resolution.
//!
//! Inventory entries ([`DeviceAccess`]) may leave the method, credentials
//! and timeout to process-wide [`Defaults`]. Resolution produces a private
//! [`Device`] for one collection attempt and never touches the inventory.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::transport::SessionConfig;

/// Config bag key overriding the target address.
pub const KEY_IP: &str = "ip";
/// Config bag key overriding the timeout, in seconds.
pub const KEY_TIMEOUT: &str = "timeout";
/// Config bag key holding the login user.
pub const KEY_USER: &str = "user";
/// Config bag key holding the login password.
pub const KEY_PASS: &str = "pass";
/// Config bag key holding the enable secret.
pub const KEY_ENABLE: &str = "enable";
/// Config bag key enabling insecure host key handling.
pub const KEY_INSECURE: &str = "insecure";
/// Config bag key holding the external script command line.
pub const KEY_SCRIPT: &str = "script";

/// One inventory entry as the operator wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceAccess {
    /// Unique identity of the device.
    pub hostname: String,

    /// Access method; falls back to the default method.
    #[serde(default)]
    pub method: Option<String>,

    /// Free-form settings: credentials, `ip`, `timeout`, `script`, ...
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl DeviceAccess {
    /// Create an inventory entry with an empty config bag.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Set the access method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set one config bag entry.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Fill in everything this entry leaves to the defaults.
    ///
    /// A missing method, user or password with no default is an operator
    /// error and is reported as fatal.
    pub fn resolve(&self, defaults: &Defaults) -> Result<Device, ConfigError> {
        let missing = |field: &'static str| ConfigError::MissingDefault {
            field,
            host: self.hostname.clone(),
        };

        let mut config = self.config.clone();

        let method = non_empty(self.method.clone())
            .or_else(|| non_empty(defaults.method.clone()))
            .ok_or_else(|| missing("method"))?;

        let timeout = match config.remove(KEY_TIMEOUT) {
            Some(raw) => parse_seconds(&raw).ok_or_else(|| ConfigError::BadTimeout {
                host: self.hostname.clone(),
                value: raw,
            })?,
            None => defaults.timeout,
        };

        let user = non_empty(config.remove(KEY_USER))
            .or_else(|| non_empty(defaults.user.clone()))
            .ok_or_else(|| missing("user"))?;
        let pass = non_empty(config.remove(KEY_PASS))
            .or_else(|| non_empty(defaults.pass.clone()))
            .ok_or_else(|| missing("pass"))?;
        let enable = non_empty(config.remove(KEY_ENABLE))
            .or_else(|| non_empty(defaults.enable.clone()))
            .unwrap_or_else(|| pass.clone());

        let target =
            non_empty(config.get(KEY_IP).cloned()).unwrap_or_else(|| self.hostname.clone());
        let insecure = defaults.insecure || config.get(KEY_INSECURE).is_some_and(|v| v == "true");

        Ok(Device {
            hostname: self.hostname.clone(),
            method,
            target,
            timeout,
            insecure,
            credentials: Credentials {
                user,
                pass: SecretString::from(pass),
                enable: SecretString::from(enable),
            },
            config,
        })
    }
}

/// An empty setting counts as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse a whole or fractional number of seconds.
fn parse_seconds(raw: &str) -> Option<Duration> {
    let seconds: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Process-wide fallbacks for inventory entries.
#[derive(Clone)]
pub struct Defaults {
    /// Default login user.
    pub user: Option<String>,

    /// Default login password.
    pub pass: Option<String>,

    /// Default enable secret; the password is used when absent.
    pub enable: Option<String>,

    /// Default access method.
    pub method: Option<String>,

    /// Default per-device timeout.
    pub timeout: Duration,

    /// Disable host key checking for every device.
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user: None,
            pass: None,
            enable: None,
            method: None,
            timeout: Duration::from_secs(60),
            insecure: false,
        }
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("enable", &self.enable.as_ref().map(|_| "<redacted>"))
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// Login secrets for one device.
pub struct Credentials {
    /// Login user.
    pub user: String,

    /// Login password.
    pub pass: SecretString,

    /// Enable secret.
    pub enable: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("enable", &"<redacted>")
            .finish()
    }
}

/// A fully resolved device, private to one collection attempt.
#[derive(Debug)]
pub struct Device {
    /// Unique identity of the device.
    pub hostname: String,

    /// Access method selecting the driver.
    pub method: String,

    /// Address to connect to.
    pub target: String,

    /// Budget for the whole attempt.
    pub timeout: Duration,

    /// Disable host key checking.
    pub insecure: bool,

    /// Login secrets.
    pub credentials: Credentials,

    /// Remaining config bag entries (secrets removed).
    pub config: HashMap<String, String>,
}

impl Device {
    /// Session settings for reaching this device.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(&self.target, &self.credentials.user).insecure(self.insecure)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::transport::HostKeyVerification;

    fn defaults() -> Defaults {
        Defaults {
            user: Some("backup".into()),
            pass: Some("hunter2".into()),
            method: Some("cisco".into()),
            ..Defaults::default()
        }
    }

    #[test]
    fn test_resolve_from_defaults() {
        let device = DeviceAccess::new("core1").resolve(&defaults()).unwrap();
        assert_eq!(device.method, "cisco");
        assert_eq!(device.target, "core1");
        assert_eq!(device.timeout, Duration::from_secs(60));
        assert_eq!(device.credentials.user, "backup");
        assert_eq!(device.credentials.pass.expose_secret(), "hunter2");
        // Enable falls back to the login password.
        assert_eq!(device.credentials.enable.expose_secret(), "hunter2");
        assert!(!device.insecure);
    }

    #[test]
    fn test_device_settings_win() {
        let access = DeviceAccess::new("edge1")
            .with_method("junos")
            .with_config("ip", "192.0.2.7")
            .with_config("user", "netops")
            .with_config("pass", "s3cret")
            .with_config("enable", "en4ble")
            .with_config("timeout", "12.5")
            .with_config("insecure", "true");
        let device = access.resolve(&defaults()).unwrap();

        assert_eq!(device.method, "junos");
        assert_eq!(device.target, "192.0.2.7");
        assert_eq!(device.timeout, Duration::from_millis(12_500));
        assert_eq!(device.credentials.user, "netops");
        assert_eq!(device.credentials.enable.expose_secret(), "en4ble");
        assert!(device.insecure);
        assert!(!device.config.contains_key("pass"));

        // The inventory entry itself is untouched.
        assert_eq!(access.config.get("pass").map(String::as_str), Some("s3cret"));
        assert_eq!(
            device.session_config().host_key_verification,
            HostKeyVerification::Disabled
        );
    }

    #[test]
    fn test_missing_defaults_are_fatal() {
        let err = DeviceAccess::new("core1")
            .resolve(&Defaults {
                method: None,
                ..defaults()
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No method specified for core1 and default-method not defined."
        );

        let err = DeviceAccess::new("core1")
            .resolve(&Defaults {
                pass: None,
                ..defaults()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDefault { field: "pass", .. }));
    }

    #[test]
    fn test_empty_default_is_missing() {
        let err = DeviceAccess::new("core1")
            .resolve(&Defaults {
                user: Some(String::new()),
                ..defaults()
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No user specified for core1 and default-user not defined."
        );

        let device = DeviceAccess::new("core1")
            .with_config("enable", "")
            .resolve(&defaults())
            .unwrap();
        assert_eq!(device.credentials.enable.expose_secret(), "hunter2");
    }

    #[test]
    fn test_bad_timeout_is_fatal() {
        let err = DeviceAccess::new("core1")
            .with_config("timeout", "soon")
            .resolve(&defaults())
            .unwrap_err();
        assert!(matches!(err, ConfigError::BadTimeout { .. }));
    }

    #[test]
    fn test_global_insecure() {
        let device = DeviceAccess::new("core1")
            .resolve(&Defaults {
                insecure: true,
                ..defaults()
            })
            .unwrap();
        assert!(device.insecure);
    }
}
