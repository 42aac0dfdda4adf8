//! Vendor protocol drivers.
//!
//! A [`Driver`] turns a resolved [`Device`] into a [`Collection`]. The
//! variants share nothing but that capability: the interactive driver is
//! parameterized by dialect data, the external driver by a script path.

mod collection;
mod external;
mod interactive;

pub use collection::{CONFIG, Collection};
pub use external::ExternalDriver;
pub use interactive::InteractiveDriver;

use std::future::Future;
use std::path::PathBuf;

use crate::channel::ExpectConfig;
use crate::device::Device;
use crate::error::{DriverError, Result};
use crate::platform::DialectRegistry;

/// Method name selecting the external-script driver.
pub const EXTERNAL_METHOD: &str = "external";

/// Anything that can collect outputs from a resolved device.
///
/// The scheduler is generic over this so rounds can be driven by
/// something other than real sessions.
pub trait Collector: Send + Sync + 'static {
    /// Collect from one device.
    fn collect(&self, device: &Device) -> impl Future<Output = Result<Collection>> + Send;
}

/// One of the available protocol drivers.
#[derive(Debug, Clone)]
pub enum Driver {
    /// Interactive CLI session driven through the expect engine.
    Interactive(InteractiveDriver),

    /// Out-of-process collection script.
    External(ExternalDriver),
}

impl Driver {
    /// Collect from one device with this driver.
    pub async fn collect(&self, device: &Device) -> Result<Collection> {
        match self {
            Driver::Interactive(driver) => driver.collect(device).await,
            Driver::External(driver) => driver.collect(device).await,
        }
    }
}

/// Collector that picks the driver from each device's access method.
#[derive(Debug, Clone)]
pub struct MethodDispatch {
    dialects: DialectRegistry,
    expect: ExpectConfig,
    executable_dir: PathBuf,
}

impl MethodDispatch {
    /// Create a dispatcher over the given dialects.
    pub fn new(dialects: DialectRegistry, executable_dir: impl Into<PathBuf>) -> Self {
        Self {
            dialects,
            expect: ExpectConfig::default(),
            executable_dir: executable_dir.into(),
        }
    }

    /// Override the expect engine bounds.
    pub fn with_expect(mut self, expect: ExpectConfig) -> Self {
        self.expect = expect;
        self
    }

    /// The driver for an access method.
    pub fn driver_for(&self, method: &str) -> std::result::Result<Driver, DriverError> {
        if method == EXTERNAL_METHOD {
            return Ok(Driver::External(ExternalDriver::new(&self.executable_dir)));
        }
        self.dialects
            .get(method)
            .map(|dialect| Driver::Interactive(InteractiveDriver::new(dialect.clone(), self.expect.clone())))
            .ok_or_else(|| DriverError::UnknownMethod(method.to_string()))
    }
}

impl Collector for MethodDispatch {
    async fn collect(&self, device: &Device) -> Result<Collection> {
        self.driver_for(&device.method)?.collect(device).await
    }
}
