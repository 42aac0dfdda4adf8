//! Juniper JUNOS dialect.
//!
//! Login lands directly in operational mode, which is all a configuration
//! dump needs, so there is no escalation step.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>       # operational mode
//! {master:0}
//! user@router>       # with routing-engine indicator
//! ```

use std::time::Duration;

use crate::platform::Dialect;

/// Method name for Juniper devices.
pub const DIALECT_NAME: &str = "junos";

/// Create the JUNOS dialect.
pub fn dialect() -> Dialect {
    Dialect::new(DIALECT_NAME, ">", "show configuration")
        .with_pager_command("set cli screen-length 0")
        .with_logout("exit")
        .with_quiet_period(Duration::from_millis(2500))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junos_dialect() {
        let dialect = dialect();
        assert_eq!(dialect.name, "junos");
        assert_eq!(dialect.privileged_prompt, ">");
        assert!(dialect.escalation.is_none());
        assert_eq!(dialect.pager_commands, vec!["set cli screen-length 0"]);
        assert_eq!(dialect.quiet_period, Duration::from_millis(2500));
    }
}
