//! Status registry: last attempt outcome per device.
//!
//! The whole table sits behind one lock. Every update replaces a single
//! entry, so readers never observe a half-written status.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Outcome message recorded for a successful attempt.
pub const SUCCESS: &str = "success";

/// Last known outcome for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Device identity.
    pub hostname: String,

    /// `"success"` or the failure description.
    pub message: String,

    /// When the device was last collected successfully.
    pub last_success: Option<DateTime<Utc>>,
}

impl DeviceStatus {
    /// Whether the last attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.message == SUCCESS
    }
}

/// Table of device statuses, shared between attempts and readers.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    inner: Mutex<IndexMap<String, DeviceStatus>>,
}

impl StatusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, IndexMap<String, DeviceStatus>> {
        // A panic while holding the lock cannot leave a partial entry behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a successful attempt at the current time.
    pub fn record_success(&self, hostname: &str) {
        self.record_success_at(hostname, Utc::now());
    }

    /// Record a successful attempt at `when`.
    pub fn record_success_at(&self, hostname: &str, when: DateTime<Utc>) {
        self.set(DeviceStatus {
            hostname: hostname.to_string(),
            message: SUCCESS.to_string(),
            last_success: Some(when),
        });
    }

    /// Record a failed attempt, keeping the previous success time.
    pub fn record_failure(&self, hostname: &str, message: impl Into<String>) {
        let mut table = self.table();
        let last_success = table.get(hostname).and_then(|s| s.last_success);
        table.insert(
            hostname.to_string(),
            DeviceStatus {
                hostname: hostname.to_string(),
                message: message.into(),
                last_success,
            },
        );
    }

    /// Replace the entry for `status.hostname`.
    pub fn set(&self, status: DeviceStatus) {
        self.table().insert(status.hostname.clone(), status);
    }

    /// The entry for one device.
    pub fn get(&self, hostname: &str) -> Option<DeviceStatus> {
        self.table().get(hostname).cloned()
    }

    /// Copy of the whole table in first-seen order.
    pub fn snapshot(&self) -> Vec<DeviceStatus> {
        self.table().values().cloned().collect()
    }

    /// Number of devices with a recorded status.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
