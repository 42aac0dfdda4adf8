//! Dialect definitions for multi-vendor support.
//!
//! A dialect is pure data: prompt literals, escalation and pager commands,
//! and the quiet period that ends a configuration dump.

mod dialect;
mod registry;
pub mod vendors;

pub use dialect::{Dialect, Escalation, PASSWORD_PROMPT};
pub use registry::DialectRegistry;
