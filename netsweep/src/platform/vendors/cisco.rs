//! Cisco IOS / IOS-XE / ASA dialect.
//!
//! # Prompt Examples
//!
//! ```text
//! router>            # user EXEC, needs `enable`
//! router#            # privileged EXEC
//! asa/pri/act#       # ASA context, privileged
//! ```
//!
//! IOS understands `terminal length 0`; ASA wants `terminal pager 0`.
//! Both are sent and the unknown one is simply rejected by the device.

use std::time::Duration;

use crate::platform::Dialect;

/// Method name for Cisco devices.
pub const DIALECT_NAME: &str = "cisco";

/// Create the Cisco dialect.
pub fn dialect() -> Dialect {
    Dialect::new(DIALECT_NAME, "#", "show running-config")
        .with_escalation(">", "enable")
        .with_pager_command("terminal length 0")
        .with_pager_command("terminal pager 0")
        .with_logout("exit")
        .with_quiet_period(Duration::from_secs(2))
}
