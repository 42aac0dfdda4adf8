//! Expect primitives over a session's inbound flow.

use std::time::Duration;

use log::{debug, trace};
use tokio::time::{Instant, timeout, timeout_at};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, TransportError};
use crate::transport::Session;

/// Bounds applied by the expect primitives.
#[derive(Debug, Clone)]
pub struct ExpectConfig {
    /// Longest time a single pattern wait may take.
    pub pattern_timeout: Duration,

    /// Hard ceiling on one quiet-terminated capture.
    pub capture_ceiling: Duration,

    /// Largest capture accepted, in bytes.
    pub max_capture_bytes: usize,
}

impl Default for ExpectConfig {
    fn default() -> Self {
        Self {
            pattern_timeout: Duration::from_secs(30),
            capture_ceiling: Duration::from_secs(300),
            max_capture_bytes: 64 * 1024 * 1024,
        }
    }
}

/// A session wrapped with the expect engine.
///
/// Every primitive consumes the inbound flow: text matched (or captured)
/// by one call is never seen by a later one, so callers must expect
/// patterns in the order the device emits them.
pub struct Channel {
    session: Session,
    buffer: PatternBuffer,
    config: ExpectConfig,
}

impl Channel {
    /// Wrap an open session.
    pub fn new(session: Session, config: ExpectConfig) -> Self {
        Self {
            session,
            buffer: PatternBuffer::new(),
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExpectConfig {
        &self.config
    }

    /// The host of the underlying session.
    pub fn host(&self) -> &str {
        self.session.host()
    }

    /// Write `data` verbatim to the session.
    pub async fn send(&self, data: &str) -> Result<(), TransportError> {
        self.session.send(data).await
    }

    /// Wait until `pattern` appears, consuming output through the match.
    pub async fn await_literal(&mut self, pattern: &str) -> Result<(), ChannelError> {
        self.await_first_of(&[pattern]).await.map(|_| ())
    }

    /// Wait until any candidate appears and return the one that matched.
    ///
    /// After every chunk the candidates are checked in the given order, so
    /// an earlier candidate wins even when a later one occurs earlier in
    /// the output.
    pub async fn await_first_of<'p>(
        &mut self,
        patterns: &[&'p str],
    ) -> Result<&'p str, ChannelError> {
        let limit = self.config.pattern_timeout;
        let expected = || patterns.join("|");

        let found = timeout(limit, async {
            loop {
                if let Some((index, end)) = self.buffer.find_first_of(patterns) {
                    self.buffer.consume(end);
                    return Ok(patterns[index]);
                }
                match self.session.recv().await {
                    Some(chunk) => {
                        trace!("{}: +{} bytes", self.session.host(), chunk.len());
                        self.buffer.extend(&chunk);
                    }
                    None => return Err(ChannelError::Closed { expected: expected() }),
                }
            }
        })
        .await
        .map_err(|_| ChannelError::PatternTimeout {
            expected: expected(),
            timeout: limit,
        })??;

        debug!("{}: matched {:?}", self.session.host(), found);
        Ok(found)
    }

    /// Accumulate output until nothing arrives for `max_idle`, then return
    /// everything accumulated (including unconsumed earlier output).
    ///
    /// Fails if the session closes first, if output is still arriving after
    /// the capture ceiling, or if the capture outgrows the size cap.
    pub async fn capture_until_quiet(&mut self, max_idle: Duration) -> Result<String, ChannelError> {
        let ceiling = self.config.capture_ceiling;
        let deadline = Instant::now() + ceiling;
        let max_bytes = self.config.max_capture_bytes;

        let captured = timeout_at(deadline, async {
            loop {
                match timeout(max_idle, self.session.recv()).await {
                    Ok(Some(chunk)) => {
                        self.buffer.extend(&chunk);
                        if self.buffer.len() > max_bytes {
                            return Err(ChannelError::CaptureTooLarge(max_bytes));
                        }
                    }
                    Ok(None) => {
                        return Err(ChannelError::Closed {
                            expected: format!("{:?} of quiet", max_idle),
                        });
                    }
                    Err(_) => return Ok(self.buffer.take()),
                }
            }
        })
        .await
        .map_err(|_| ChannelError::CaptureStalled(ceiling))??;

        debug!(
            "{}: captured {} bytes",
            self.session.host(),
            captured.len()
        );
        Ok(String::from_utf8_lossy(&captured).into_owned())
    }

    /// Hand back the session, dropping any unconsumed output.
    pub fn into_session(self) -> Session {
        self.session
    }
}
