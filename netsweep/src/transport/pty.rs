//! Remote shell subprocess attached to a pseudo-terminal.
//!
//! Many ssh clients and devices only emit interactive prompts on a real
//! terminal, so the client runs on the slave side of a PTY and the session
//! talks to the master side. Three blocking tasks serve each session:
//! a reader publishing chunks, a writer draining the outbound flow, and a
//! reaper waiting on the child.

use std::io::{ErrorKind, Read, Write};

use bytes::Bytes;
use log::{debug, trace};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::config::SessionConfig;
use super::session::{Outgoing, Session};
use crate::error::TransportError;

/// Size of a single read from the terminal.
const READ_CHUNK_SIZE: usize = 8192;

/// Queue depth of the inbound and outbound flows.
const FLOW_CAPACITY: usize = 256;

/// Master side of a freshly spawned PTY session.
struct Spawned {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
}

/// Spawn the remote shell and wire it up as a [`Session`].
pub async fn open(config: &SessionConfig) -> Result<Session, TransportError> {
    let spawn_config = config.clone();
    let spawned = tokio::task::spawn_blocking(move || spawn(&spawn_config))
        .await
        .map_err(|e| TransportError::SpawnFailed {
            host: config.host.clone(),
            message: e.to_string(),
        })??;
    let Spawned {
        master,
        mut child,
        killer,
        reader,
        writer,
    } = spawned;

    debug!(
        "{}: spawned {} {:?}",
        config.host,
        config.ssh_bin,
        config.args()
    );

    let (inbound_tx, inbound_rx) = mpsc::channel(FLOW_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(FLOW_CAPACITY);

    let host = config.host.clone();
    tokio::task::spawn_blocking(move || read_loop(host, reader, inbound_tx));

    let host = config.host.clone();
    tokio::task::spawn_blocking(move || write_loop(host, writer, outbound_rx));

    let host = config.host.clone();
    tokio::task::spawn_blocking(move || {
        // Keep the master open until the child is gone.
        let _master = master;
        match child.wait() {
            Ok(status) => debug!("{}: session process exited: {:?}", host, status),
            Err(e) => debug!("{}: failed to reap session process: {}", host, e),
        }
    });

    Ok(Session::from_parts(
        config.host.clone(),
        inbound_rx,
        outbound_tx,
        Some(killer),
    ))
}

/// Open the PTY and start the client on it.
fn spawn(config: &SessionConfig) -> Result<Spawned, TransportError> {
    let spawn_failed = |message: String| TransportError::SpawnFailed {
        host: config.host.clone(),
        message,
    };

    let pair = native_pty_system()
        .openpty(PtySize {
            rows: config.terminal_height,
            cols: config.terminal_width,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| spawn_failed(e.to_string()))?;

    let mut command = CommandBuilder::new(&config.ssh_bin);
    command.args(config.args());

    let child = pair
        .slave
        .spawn_command(command)
        .map_err(|e| spawn_failed(e.to_string()))?;
    // Only the child may hold the slave, otherwise reads never see EOF.
    drop(pair.slave);

    let killer = child.clone_killer();
    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| spawn_failed(e.to_string()))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| spawn_failed(e.to_string()))?;

    Ok(Spawned {
        master: pair.master,
        child,
        killer,
        reader,
        writer,
    })
}

/// Publish every non-empty read as one chunk; any read error (including
/// the EIO seen when the child exits) closes the inbound flow.
fn read_loop(host: String, mut reader: Box<dyn Read + Send>, tx: mpsc::Sender<Bytes>) {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                trace!("{}: read {} bytes", host, n);
                if tx.blocking_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("{}: read loop ended: {}", host, e);
                break;
            }
        }
    }
}

/// Write outbound strings verbatim until the flow closes or a write fails.
fn write_loop(host: String, mut writer: Box<dyn Write + Send>, mut rx: mpsc::Receiver<Outgoing>) {
    while let Some(Outgoing { data, ack }) = rx.blocking_recv() {
        let result = writer
            .write_all(data.as_bytes())
            .and_then(|()| writer.flush());
        let failed = result.is_err();
        let _ = ack.send(result);
        if failed {
            debug!("{}: write loop ended after failed write", host);
            break;
        }
    }
}
