//! # Netsweep
//!
//! Running-config backups for routers and switches.
//!
//! Netsweep logs in to each device over an interactive SSH session,
//! walks the vendor's login dialogue with an expect engine and captures the
//! configuration dump. Devices that cannot be driven interactively are
//! handed to an external script instead.
//!
//! ## Features
//!
//! - PTY-backed SSH sessions with separate inbound and outbound flows
//! - Expect primitives: single literal, first-of branch, capture until quiet
//! - Vendor dialects as data (Cisco, Junos; register your own)
//! - Bounded-concurrency rounds with per-device timeouts
//! - Status registry with the last outcome of every device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netsweep::{DeviceAccess, DialectRegistry, MethodDispatch, Scheduler, StatusRegistry, Workspace};
//! use netsweep::device::Defaults;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netsweep::Error> {
//!     let defaults = Defaults {
//!         user: Some("backup".into()),
//!         pass: Some("secret".into()),
//!         method: Some("cisco".into()),
//!         ..Defaults::default()
//!     };
//!     let scheduler = Scheduler::new(
//!         MethodDispatch::new(DialectRegistry::with_builtins(), "/usr/local/libexec/netsweep"),
//!         Arc::new(StatusRegistry::new()),
//!         Arc::new(Workspace::new("/var/lib/netsweep")),
//!         defaults,
//!     )
//!     .with_concurrency(10);
//!
//!     let summary = scheduler.run_round(&[DeviceAccess::new("core1")]).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod platform;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use config::Options;
pub use device::{Device, DeviceAccess};
pub use driver::{Collection, Collector, Driver, MethodDispatch};
pub use error::Error;
pub use platform::{Dialect, DialectRegistry};
pub use scheduler::{RoundSummary, Scheduler};
pub use status::{DeviceStatus, StatusRegistry};
pub use store::{ConfigStore, Workspace};
pub use transport::SessionConfig;
