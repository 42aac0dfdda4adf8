//! Error types for netsweep.
//!
//! Per-device failures (transport, channel, driver) are caught by the
//! scheduler and turned into status entries. Configuration and storage
//! errors are fatal to the whole process.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netsweep operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Session transport errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Expect engine errors
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Protocol driver errors
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Operator configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persistence errors
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Whether this error must abort the whole process rather than a
    /// single device attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Storage(_))
    }
}

/// Session layer errors (subprocess, pseudo-terminal, writes).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to allocate a pseudo-terminal or spawn the remote shell
    #[error("failed to open session to {host}: {message}")]
    SpawnFailed { host: String, message: String },

    /// Writing to the terminal failed; the session is unusable
    #[error("write to session failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// The session's outbound flow is gone
    #[error("session disconnected")]
    Disconnected,
}

/// Expect engine errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The inbound flow ended before the expected text appeared
    #[error("session closed while waiting for {expected:?}")]
    Closed { expected: String },

    /// A wait exceeded its bound
    #[error("pattern {expected:?} not found within {timeout:?}")]
    PatternTimeout { expected: String, timeout: Duration },

    /// Output kept arriving past the capture ceiling
    #[error("capture stalled: output still arriving after {0:?}")]
    CaptureStalled(Duration),

    /// Output exceeded the capture size cap
    #[error("capture exceeded {0} bytes")]
    CaptureTooLarge(usize),
}

/// Protocol driver errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device asked for the login password again
    #[error("{host}: Bad login password.")]
    BadPassword { host: String },

    /// Privilege escalation did not reach the privileged prompt
    #[error("{host}: privilege escalation failed: {reason}")]
    EscalationFailed { host: String, reason: String },

    /// No driver for this access method
    #[error("Unknown access method: {0}")]
    UnknownMethod(String),

    /// The collection finished without a configuration
    #[error("{host}: config missing from collection results")]
    MissingOutput { host: String },

    /// The external script is not usable
    #[error("{host}: invalid script {script:?}: {message}")]
    InvalidScript {
        host: String,
        script: String,
        message: String,
    },

    /// The external script could not be started
    #[error("{host}: failed to start {}: {source}", .program.display())]
    ScriptSpawn {
        host: String,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external script exited unsuccessfully
    #[error("Error collecting from {host}: {message}")]
    ScriptFailed { host: String, message: String },

    /// The attempt outlived the device timeout
    #[error("Timeout collecting from {host} after {} seconds", .timeout.as_secs_f64())]
    Timeout { host: String, timeout: Duration },

    /// The interrupt signal could not be delivered
    #[error("{host}: failed to interrupt script: {source}")]
    Signal {
        host: String,
        #[source]
        source: nix::Error,
    },
}

/// Operator configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent on the device and has no default
    #[error("No {field} specified for {host} and default-{field} not defined.")]
    MissingDefault { field: &'static str, host: String },

    /// The per-device timeout override could not be parsed
    #[error("Bad timeout setting {value} for host {host}")]
    BadTimeout { host: String, value: String },

    /// The options file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The options file is not valid YAML for this schema
    #[error("failed to parse options: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The options are structurally valid but unusable
    #[error("invalid options: {message}")]
    Invalid { message: String },
}

/// Persistence errors. Always fatal.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The collected text could not be written
    #[error("Error saving config for {host} to {}: {source}", .path.display())]
    Write {
        host: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using netsweep's Error.
pub type Result<T> = std::result::Result<T, Error>;
