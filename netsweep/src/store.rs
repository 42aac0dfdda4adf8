//! Persistence seam for collected configurations.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::StorageError;

/// Durable storage for collected text, keyed by device.
///
/// A failed save ends the whole run.
pub trait ConfigStore: Send + Sync {
    /// Save `text` under `hostname`, replacing what was there.
    fn save(&self, hostname: &str, text: &str) -> Result<(), StorageError>;
}

/// Directory holding one file per device.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Use `dir` as the workspace.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a device's configuration is written to.
    pub fn path_for(&self, hostname: &str) -> PathBuf {
        self.dir.join(hostname)
    }
}

impl ConfigStore for Workspace {
    fn save(&self, hostname: &str, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(hostname);
        debug!("{}: writing {} bytes to {}", hostname, text.len(), path.display());
        fs::write(&path, text).map_err(|source| StorageError::Write {
            host: hostname.to_string(),
            path,
            source,
        })
    }
}
