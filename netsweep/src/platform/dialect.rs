//! Dialect definition: everything that differs between interactive CLIs.

use std::time::Duration;

/// Literal every supported CLI prints when asking for a password.
///
/// Leaving off the first letter matches both "Password:" and "password:".
pub const PASSWORD_PROMPT: &str = "assword:";

/// How to move from the unprivileged to the privileged prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    /// Command that requests privileged mode (e.g. `enable`).
    pub command: String,

    /// Literal that marks the escalation password prompt.
    pub password_prompt: String,
}

/// Prompts and commands of one vendor CLI.
///
/// Adding a vendor is a matter of building one of these; the interactive
/// driver has no vendor-specific code paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Method name that selects this dialect (e.g. "cisco").
    pub name: String,

    /// Literal of the login password prompt.
    pub password_prompt: String,

    /// Literal that marks the privileged prompt.
    pub privileged_prompt: String,

    /// Literal that marks the unprivileged prompt, for CLIs that may land
    /// there after login.
    pub unprivileged_prompt: Option<String>,

    /// Escalation from the unprivileged prompt.
    pub escalation: Option<Escalation>,

    /// Commands that turn off paging, each answered by the privileged prompt.
    pub pager_commands: Vec<String>,

    /// Command that prints the configuration.
    pub dump_command: String,

    /// Command that ends the session.
    pub logout_command: String,

    /// Idle gap that marks the end of the dump output.
    pub quiet_period: Duration,
}

impl Dialect {
    /// Create a dialect with the common defaults: password prompt
    /// `assword:`, no unprivileged prompt, logout with `exit` and a two
    /// second quiet period.
    pub fn new(
        name: impl Into<String>,
        privileged_prompt: impl Into<String>,
        dump_command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            password_prompt: PASSWORD_PROMPT.to_string(),
            privileged_prompt: privileged_prompt.into(),
            unprivileged_prompt: None,
            escalation: None,
            pager_commands: vec![],
            dump_command: dump_command.into(),
            logout_command: "exit".to_string(),
            quiet_period: Duration::from_secs(2),
        }
    }

    /// Set the unprivileged prompt and the escalation used to leave it.
    pub fn with_escalation(
        mut self,
        unprivileged_prompt: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        self.unprivileged_prompt = Some(unprivileged_prompt.into());
        self.escalation = Some(Escalation {
            command: command.into(),
            password_prompt: self.password_prompt.clone(),
        });
        self
    }

    /// Set an unprivileged prompt with no way out of it.
    pub fn with_unprivileged_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.unprivileged_prompt = Some(prompt.into());
        self
    }

    /// Add a pager-disabling command.
    pub fn with_pager_command(mut self, command: impl Into<String>) -> Self {
        self.pager_commands.push(command.into());
        self
    }

    /// Set the logout command.
    pub fn with_logout(mut self, command: impl Into<String>) -> Self {
        self.logout_command = command.into();
        self
    }

    /// Set the quiet period that ends the dump capture.
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Candidates checked right after the login password is sent.
    ///
    /// The password prompt comes first so a re-prompt (bad password) wins
    /// over any prompt character that happens to be in the same output.
    pub fn login_outcomes(&self) -> Vec<&str> {
        let mut candidates = vec![
            self.password_prompt.as_str(),
            self.privileged_prompt.as_str(),
        ];
        if let Some(ref unprivileged) = self.unprivileged_prompt {
            candidates.push(unprivileged.as_str());
        }
        candidates
    }
}
