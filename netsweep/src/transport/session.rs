//! Session handle: an inbound chunk flow and an outbound string flow.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use log::debug;
use portable_pty::ChildKiller;
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;

/// One outbound write and the slot its result is reported on.
#[derive(Debug)]
pub struct Outgoing {
    /// Text written verbatim to the terminal.
    pub data: String,

    /// Receives the outcome of the write.
    pub ack: oneshot::Sender<io::Result<()>>,
}

/// A live bidirectional connection to one device's command shell.
///
/// Owned by exactly one driver for one collection attempt. Dropping the
/// session kills the underlying subprocess, which also ends the reader
/// and writer tasks.
pub struct Session {
    host: String,
    inbound: mpsc::Receiver<Bytes>,
    outbound: mpsc::Sender<Outgoing>,
    killer: Option<Box<dyn ChildKiller + Send + Sync>>,
}

impl Session {
    /// Assemble a session from its two flows.
    pub(crate) fn from_parts(
        host: impl Into<String>,
        inbound: mpsc::Receiver<Bytes>,
        outbound: mpsc::Sender<Outgoing>,
        killer: Option<Box<dyn ChildKiller + Send + Sync>>,
    ) -> Self {
        Self {
            host: host.into(),
            inbound,
            outbound,
            killer,
        }
    }

    /// The host this session is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Receive the next inbound chunk, or `None` once the flow has closed.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.inbound.recv().await
    }

    /// Write `data` verbatim and wait for the write to complete.
    pub async fn send(&self, data: &str) -> Result<(), TransportError> {
        let (ack, done) = oneshot::channel();
        self.outbound
            .send(Outgoing {
                data: data.to_string(),
                ack,
            })
            .await
            .map_err(|_| TransportError::Disconnected)?;

        done.await
            .map_err(|_| TransportError::Disconnected)?
            .map_err(TransportError::WriteFailed)
    }

    /// Drain output until the remote side hangs up or `grace` elapses,
    /// then tear the session down.
    pub async fn close(mut self, grace: Duration) {
        let drained = tokio::time::timeout(grace, async {
            while self.inbound.recv().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            debug!("{}: session still open after {:?}, killing", self.host, grace);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut killer) = self.killer.take() {
            // Fails harmlessly when the child already exited after logout.
            if let Err(e) = killer.kill() {
                debug!("{}: kill on drop: {}", self.host, e);
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("killer", &self.killer.as_ref().map(|_| "<ChildKiller>"))
            .finish()
    }
}
