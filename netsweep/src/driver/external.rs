//! External-script driver: delegates collection to an executable.
//!
//! The script named by the device's `script` setting prints the
//! configuration on stdout. Nothing is driven interactively.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::collection::Collection;
use crate::device::{Device, KEY_SCRIPT};
use crate::error::{DriverError, Result};

/// How long an interrupted script gets to exit before it is killed.
const INTERRUPT_GRACE: Duration = Duration::from_secs(2);

/// Driver running an out-of-process collection script.
#[derive(Debug, Clone)]
pub struct ExternalDriver {
    executable_dir: PathBuf,
}

impl ExternalDriver {
    /// Create a driver resolving relative script paths against `executable_dir`.
    pub fn new(executable_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable_dir: executable_dir.into(),
        }
    }

    /// Split the device's script setting into a program and its arguments.
    pub fn command_line(&self, device: &Device) -> std::result::Result<(PathBuf, Vec<String>), DriverError> {
        let invalid = |script: &str, message: &str| DriverError::InvalidScript {
            host: device.hostname.clone(),
            script: script.to_string(),
            message: message.to_string(),
        };

        let script = device
            .config
            .get(KEY_SCRIPT)
            .ok_or_else(|| invalid("", "no script configured"))?;
        let mut words = shell_words::split(script)
            .map_err(|e| invalid(script, &e.to_string()))?
            .into_iter();
        let program = words.next().ok_or_else(|| invalid(script, "empty command"))?;

        let program = Path::new(&program);
        let program = if program.is_absolute() {
            program.to_path_buf()
        } else {
            self.executable_dir.join(program)
        };
        Ok((program, words.collect()))
    }

    /// Run the script under the device timeout and return its stdout.
    pub async fn collect(&self, device: &Device) -> Result<Collection> {
        let start = Instant::now();
        let host = device.hostname.as_str();
        let (program, args) = self.command_line(device)?;

        debug!("{}: running {} {:?}", host, program.display(), args);
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DriverError::ScriptSpawn {
                host: host.to_string(),
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut script = ScriptGuard::new(child, host);
        let run = async {
            tokio::try_join!(script.wait(), read_all(stdout), read_all(stderr))
        };

        let outcome = tokio::time::timeout(device.timeout, run).await;
        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                script.exited();
                if status.success() {
                    let config = String::from_utf8_lossy(&stdout).into_owned();
                    return Ok(Collection::config(config, start.elapsed()));
                }
                let stderr = String::from_utf8_lossy(&stderr);
                Err(DriverError::ScriptFailed {
                    host: host.to_string(),
                    message: format!("{} {}", stderr.trim_end_matches('\n'), status),
                }
                .into())
            }
            Ok(Err(e)) => Err(DriverError::ScriptFailed {
                host: host.to_string(),
                message: e.to_string(),
            }
            .into()),
            Err(_) => {
                script.interrupt().await?;
                Err(DriverError::Timeout {
                    host: host.to_string(),
                    timeout: device.timeout,
                }
                .into())
            }
        }
    }
}

/// Owns a running script until it exits.
///
/// Dropped early (the attempt was abandoned), it interrupts the script in
/// the background instead of killing it outright.
struct ScriptGuard {
    child: Option<Child>,
    host: String,
}

impl ScriptGuard {
    fn new(child: Child, host: &str) -> Self {
        Self {
            child: Some(child),
            host: host.to_string(),
        }
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await,
            None => Err(io::Error::other("script already released")),
        }
    }

    /// The script has been reaped; nothing to clean up.
    fn exited(&mut self) {
        self.child = None;
    }

    /// Interrupt the script and wait out the grace period. The script
    /// stays guarded until then.
    async fn interrupt(&mut self) -> std::result::Result<(), DriverError> {
        if let Some(child) = self.child.as_mut() {
            interrupt(child, &self.host).await?;
        }
        self.child = None;
        Ok(())
    }
}

impl Drop for ScriptGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let host = std::mem::take(&mut self.host);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = interrupt(&mut child, &host).await {
                        warn!("{}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    debug!("{}: kill on drop: {}", host, e);
                }
            }
        }
    }
}

/// Read a child pipe to the end.
async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut data).await?;
    }
    Ok(data)
}

/// Send SIGINT and give the script a moment to exit; `kill_on_drop`
/// finishes it off otherwise.
async fn interrupt(child: &mut Child, host: &str) -> std::result::Result<(), DriverError> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(|_| DriverError::Signal {
        host: host.to_string(),
        source: nix::Error::ESRCH,
    })?;

    signal::kill(Pid::from_raw(pid), Signal::SIGINT).map_err(|source| DriverError::Signal {
        host: host.to_string(),
        source,
    })?;

    if tokio::time::timeout(INTERRUPT_GRACE, child.wait()).await.is_err() {
        warn!("{}: script ignored SIGINT, killing it", host);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Defaults, DeviceAccess};
    use crate::error::Error;

    fn device(script: &str, timeout: &str) -> Device {
        let defaults = Defaults {
            user: Some("backup".into()),
            pass: Some("secret".into()),
            ..Defaults::default()
        };
        DeviceAccess::new("fw1")
            .with_method("external")
            .with_config("script", script)
            .with_config("timeout", timeout)
            .resolve(&defaults)
            .unwrap()
    }

    #[test]
    fn test_relative_script_path() {
        let driver = ExternalDriver::new("/opt/netsweep/scripts");
        let (program, args) = driver
            .command_line(&device("backup-asa.sh --context 'admin ctx'", "60"))
            .unwrap();
        assert_eq!(program, PathBuf::from("/opt/netsweep/scripts/backup-asa.sh"));
        assert_eq!(args, vec!["--context", "admin ctx"]);
    }

    #[test]
    fn test_absolute_script_path() {
        let driver = ExternalDriver::new("/opt/netsweep/scripts");
        let (program, args) = driver.command_line(&device("/usr/local/bin/pull", "60")).unwrap();
        assert_eq!(program, PathBuf::from("/usr/local/bin/pull"));
        assert!(args.is_empty());
    }

    #[test]
    fn test_unbalanced_quotes() {
        let driver = ExternalDriver::new("/tmp");
        let err = driver.command_line(&device("pull 'fw1", "60")).unwrap_err();
        assert!(matches!(err, DriverError::InvalidScript { .. }));
    }

    #[tokio::test]
    async fn test_script_output_is_config() {
        let driver = ExternalDriver::new("/tmp");
        let collection = driver
            .collect(&device("/bin/sh -c 'echo hostname fw1'", "10"))
            .await
            .unwrap();
        assert_eq!(collection.config_text(), Some("hostname fw1\n"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_embeds_stderr() {
        let driver = ExternalDriver::new("/tmp");
        let err = driver
            .collect(&device("/bin/sh -c 'echo denied >&2; exit 3'", "10"))
            .await
            .unwrap_err();
        match err {
            Error::Driver(DriverError::ScriptFailed { host, message }) => {
                assert_eq!(host, "fw1");
                assert!(message.starts_with("denied "), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Script that records SIGINT in `marker` and otherwise runs forever.
    fn trapping_script(dir: &Path, marker: &Path) -> String {
        let path = dir.join("trap-int.sh");
        std::fs::write(
            &path,
            "trap 'echo int > \"$1\"; exit 1' INT\nwhile :; do sleep 0.1; done\n",
        )
        .unwrap();
        format!("/bin/sh {} {}", path.display(), marker.display())
    }

    async fn wait_for_file(path: &Path) -> bool {
        for _ in 0..50 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_script_timeout_interrupts() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("interrupted");
        let driver = ExternalDriver::new("/tmp");
        let start = Instant::now();

        let err = driver
            .collect(&device(&trapping_script(dir.path(), &marker), "0.5"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Driver(DriverError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(wait_for_file(&marker).await, "script never saw SIGINT");
    }

    #[tokio::test]
    async fn test_abandoned_collect_interrupts_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("interrupted");
        let driver = ExternalDriver::new("/tmp");
        let device = device(&trapping_script(dir.path(), &marker), "60");

        let abandoned = tokio::time::timeout(Duration::from_millis(500), driver.collect(&device)).await;
        assert!(abandoned.is_err());

        assert!(wait_for_file(&marker).await, "script never saw SIGINT");
    }
}
