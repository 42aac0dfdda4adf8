//! Interactive CLI driver: drives a login dialogue to a configuration dump.
//!
//! The protocol is the same for every vendor, only the [`Dialect`] data
//! differs:
//!
//! ```text
//! await password prompt → send password
//!   → { password prompt again  ⇒ bad login
//!     | unprivileged prompt    ⇒ escalate (if the dialect can)
//!     | privileged prompt }
//!   → disable paging (each answered by the prompt)
//!   → send dump command → capture until quiet → logout
//! ```
//!
//! Any failing step ends the attempt; later steps are never tried.

use std::time::{Duration, Instant};

use log::{debug, warn};
use secrecy::ExposeSecret;

use super::collection::Collection;
use crate::channel::{Channel, ExpectConfig};
use crate::device::Device;
use crate::error::{DriverError, Result};
use crate::platform::{Dialect, Escalation};
use crate::transport::{self, Session};

/// How long to wait for the device to hang up after logout.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Driver for one interactive CLI dialect.
#[derive(Debug, Clone)]
pub struct InteractiveDriver {
    dialect: Dialect,
    expect: ExpectConfig,
}

impl InteractiveDriver {
    /// Create a driver for `dialect`.
    pub fn new(dialect: Dialect, expect: ExpectConfig) -> Self {
        Self { dialect, expect }
    }

    /// Get the dialect.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Open a session to the device and collect its configuration.
    pub async fn collect(&self, device: &Device) -> Result<Collection> {
        let session = transport::open(&device.session_config()).await?;
        self.run(session, device).await
    }

    /// Collect the configuration over an already open session.
    pub async fn run(&self, session: Session, device: &Device) -> Result<Collection> {
        let start = Instant::now();
        let dialect = &self.dialect;
        let host = device.hostname.as_str();
        let mut channel = Channel::new(session, self.expect.clone());

        channel.await_literal(&dialect.password_prompt).await?;
        debug!("{}: sending login password", host);
        channel
            .send(&line(device.credentials.pass.expose_secret()))
            .await?;

        let outcomes = dialect.login_outcomes();
        let landed = channel.await_first_of(&outcomes).await?;

        let mut prompt = landed;
        if landed == dialect.password_prompt {
            return Err(DriverError::BadPassword {
                host: host.to_string(),
            }
            .into());
        } else if dialect.unprivileged_prompt.as_deref() == Some(landed) {
            if let Some(ref escalation) = dialect.escalation {
                self.escalate(&mut channel, escalation, device).await?;
                prompt = dialect.privileged_prompt.as_str();
            }
        }

        for command in &dialect.pager_commands {
            debug!("{}: {}", host, command);
            channel.send(&line(command)).await?;
            channel.await_literal(prompt).await?;
        }

        debug!("{}: {}", host, dialect.dump_command);
        channel.send(&line(&dialect.dump_command)).await?;
        let config = channel.capture_until_quiet(dialect.quiet_period).await?;

        // Logout is best-effort; the capture is already complete.
        if let Err(e) = channel.send(&line(&dialect.logout_command)).await {
            warn!("{}: logout failed: {}", host, e);
        }
        channel.into_session().close(CLOSE_GRACE).await;

        Ok(Collection::config(config, start.elapsed()))
    }

    /// Move from the unprivileged to the privileged prompt.
    async fn escalate(
        &self,
        channel: &mut Channel,
        escalation: &Escalation,
        device: &Device,
    ) -> Result<()> {
        let host = device.hostname.as_str();
        let failed = |reason: String| DriverError::EscalationFailed {
            host: host.to_string(),
            reason,
        };

        debug!("{}: {}", host, escalation.command);
        channel.send(&line(&escalation.command)).await?;
        channel
            .await_literal(&escalation.password_prompt)
            .await
            .map_err(|e| failed(e.to_string()))?;

        debug!("{}: sending enable secret", host);
        channel
            .send(&line(device.credentials.enable.expose_secret()))
            .await?;

        let mut outcomes = vec![
            escalation.password_prompt.as_str(),
            self.dialect.privileged_prompt.as_str(),
        ];
        if let Some(ref unprivileged) = self.dialect.unprivileged_prompt {
            outcomes.push(unprivileged.as_str());
        }
        let reached = channel
            .await_first_of(&outcomes)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if reached != self.dialect.privileged_prompt {
            return Err(failed("Bad enable password.".to_string()).into());
        }
        Ok(())
    }
}

/// Terminate a command with a newline.
fn line(command: &str) -> String {
    format!("{}\n", command)
}
