//! In-memory session for scripting a device dialogue without a subprocess.
//!
//! ```rust
//! use netsweep::transport::loopback;
//!
//! # async fn example() {
//! let (session, mut remote) = loopback::pair("core1");
//! tokio::spawn(async move {
//!     remote.emit("Password:").await;
//!     let reply = remote.next_write().await;
//!     assert_eq!(reply.as_deref(), Some("secret\n"));
//! });
//! # drop(session);
//! # }
//! ```

use std::io;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::session::{Outgoing, Session};

/// Create a connected session and the remote end that drives it.
pub fn pair(host: impl Into<String>) -> (Session, Remote) {
    let (chunks_tx, chunks_rx) = mpsc::channel(64);
    let (writes_tx, writes_rx) = mpsc::channel(64);
    let session = Session::from_parts(host, chunks_rx, writes_tx, None);
    let remote = Remote {
        chunks: Some(chunks_tx),
        writes: writes_rx,
        fail_writes: false,
    };
    (session, remote)
}

/// Device side of a loopback session.
#[derive(Debug)]
pub struct Remote {
    chunks: Option<mpsc::Sender<Bytes>>,
    writes: mpsc::Receiver<Outgoing>,
    fail_writes: bool,
}

impl Remote {
    /// Deliver one chunk to the session. Returns `false` once the session
    /// side is gone or the remote has hung up.
    pub async fn emit(&self, text: &str) -> bool {
        match &self.chunks {
            Some(tx) => tx.send(Bytes::copy_from_slice(text.as_bytes())).await.is_ok(),
            None => false,
        }
    }

    /// Receive the next string the session wrote, acknowledging it.
    pub async fn next_write(&mut self) -> Option<String> {
        let Outgoing { data, ack } = self.writes.recv().await?;
        let result = if self.fail_writes {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
        } else {
            Ok(())
        };
        let _ = ack.send(result);
        Some(data)
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    /// Close the inbound flow, as a process exit would.
    pub fn hang_up(&mut self) {
        self.chunks = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (mut session, mut remote) = pair("core1");
        assert!(remote.emit("one").await);
        assert!(remote.emit("two").await);
        remote.hang_up();

        assert_eq!(session.recv().await.as_deref(), Some(&b"one"[..]));
        assert_eq!(session.recv().await.as_deref(), Some(&b"two"[..]));
        assert!(session.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced() {
        let (session, mut remote) = pair("core1");
        remote.fail_writes();
        let device = tokio::spawn(async move { remote.next_write().await });

        let err = session.send("exit\n").await.unwrap_err();
        assert!(matches!(err, TransportError::WriteFailed(_)));
        assert_eq!(device.await.unwrap().as_deref(), Some("exit\n"));
    }

    #[tokio::test]
    async fn test_send_after_remote_dropped() {
        let (session, remote) = pair("core1");
        drop(remote);
        let err = session.send("show version\n").await.unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }
}
