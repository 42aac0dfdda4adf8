//! Session configuration.

/// Default binary used to open the remote shell.
pub const DEFAULT_SSH_BIN: &str = "ssh";

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Leave the decision to the ssh client and its configuration.
    #[default]
    ClientDefault,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// Configuration for spawning one remote shell session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port; `None` leaves it to the ssh client.
    pub port: Option<u16>,

    /// Login username.
    pub username: String,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Binary to execute (normally `ssh`).
    pub ssh_bin: String,

    /// Extra arguments passed before the destination.
    pub extra_args: Vec<String>,

    /// Terminal width for the PTY.
    pub terminal_width: u16,

    /// Terminal height for the PTY.
    pub terminal_height: u16,
}

impl SessionConfig {
    /// Create a configuration with the default ssh client settings.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: username.into(),
            host_key_verification: HostKeyVerification::default(),
            ssh_bin: DEFAULT_SSH_BIN.to_string(),
            extra_args: Vec::new(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Disable host key checking when `insecure` is set.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.host_key_verification = if insecure {
            HostKeyVerification::Disabled
        } else {
            HostKeyVerification::ClientDefault
        };
        self
    }

    /// The `user@host` destination argument.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Full argument list for the ssh binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.host_key_verification == HostKeyVerification::Disabled {
            args.push("-oStrictHostKeyChecking=no".to_string());
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(self.destination());
        args
    }
}
