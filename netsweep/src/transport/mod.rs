//! Byte-stream session layer.
//!
//! A session is a remote shell (normally the system `ssh` client) running
//! on a pseudo-terminal, exposed as an inbound flow of raw chunks and an
//! outbound flow of strings.

pub mod config;
pub mod loopback;
mod pty;
mod session;

pub use config::{HostKeyVerification, SessionConfig};
pub use pty::open;
pub use session::{Outgoing, Session};
