//! Expect engine: pattern waits and quiet-terminated capture.
//!
//! This module turns a session's raw inbound chunks into control
//! decisions for the protocol drivers.

mod buffer;
mod expect;

pub use buffer::PatternBuffer;
pub use expect::{Channel, ExpectConfig};
