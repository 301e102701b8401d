// SPDX-License-Identifier: GPL-3.0-only

//! Detached child processes
//!
//! Mount executors run in their own process group so they outlive a restart of
//! the supervisor. The supervisor keeps only the pid; the exit status arrives
//! through the [`SpawnedMount::exit`] future.

use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use futures::future::BoxFuture;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SysError};
use crate::rclone::invocation::MountInvocation;

/// Line-oriented diagnostic output of a child
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// A running mount executor
pub struct SpawnedMount {
    pub pid: u32,
    pub stdout: Option<OutputStream>,
    pub stderr: Option<OutputStream>,
    /// Resolves once the child has exited
    pub exit: BoxFuture<'static, ExitReport>,
}

impl std::fmt::Debug for SpawnedMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedMount")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// How a child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub detail: String,
}

impl ExitReport {
    pub fn new(code: Option<i32>, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// A zero exit, the expected outcome after a requested termination
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.code(), status.to_string())
    }
}

/// Spawn `program` with the invocation's arguments in a new process group
pub fn spawn_detached(program: &Path, invocation: &MountInvocation) -> Result<SpawnedMount> {
    let mut command = Command::new(program);
    command
        .args(&invocation.args)
        .envs(invocation.env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        SysError::SpawnFailed(format!("Failed to execute {}: {}", program.display(), e))
    })?;

    let pid = child
        .id()
        .ok_or_else(|| SysError::SpawnFailed("Process exited before reporting a pid".to_string()))?;

    let stdout = child
        .stdout
        .take()
        .map(|stream| Box::pin(stream) as OutputStream);
    let stderr = child
        .stderr
        .take()
        .map(|stream| Box::pin(stream) as OutputStream);

    let exit: BoxFuture<'static, ExitReport> = Box::pin(async move {
        match child.wait().await {
            Ok(status) => ExitReport::from(status),
            Err(e) => ExitReport::new(None, format!("wait failed: {e}")),
        }
    });

    debug!("Spawned {} with pid {}", program.display(), pid);

    Ok(SpawnedMount {
        pid,
        stdout,
        stderr,
        exit,
    })
}

/// Send SIGTERM to `pid`, escalating to SIGKILL when the first signal fails
///
/// A process that is already gone counts as terminated.
pub fn terminate(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid).map_err(|_| SysError::SignalFailed {
        pid,
        message: "pid out of range".to_string(),
    })?;

    // Never signal init or a process group
    if raw <= 1 {
        warn!("Refusing to signal system process with PID {}", pid);
        return Err(SysError::SignalFailed {
            pid,
            message: "Refusing to signal system process".to_string(),
        });
    }

    let target = Pid::from_raw(raw);
    match kill(target, Signal::SIGTERM) {
        Ok(()) => {
            debug!("Sent SIGTERM to {}", pid);
            return Ok(());
        }
        Err(e) => {
            warn!("Sending SIGTERM to PID {} failed: {}. Forcing termination...", pid, e);
        }
    }

    match kill(target, Signal::SIGKILL) {
        Ok(()) => {
            info!("Killed process {}", pid);
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!("Process {} not found (already terminated)", pid);
            Ok(())
        }
        Err(e) => Err(SysError::SignalFailed {
            pid,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_signal_init() {
        assert!(matches!(terminate(1), Err(SysError::SignalFailed { pid: 1, .. })));
        assert!(terminate(0).is_err());
    }

    #[test]
    fn zero_exit_is_clean() {
        assert!(ExitReport::new(Some(0), "exit status: 0").is_clean());
        assert!(!ExitReport::new(Some(1), "exit status: 1").is_clean());
        assert!(!ExitReport::new(None, "signal: 9").is_clean());
    }

    #[tokio::test]
    async fn spawned_child_reports_exit_and_output() {
        use tokio::io::AsyncReadExt;

        let invocation = MountInvocation {
            remote: String::new(),
            mount_point: std::path::PathBuf::from("/"),
            args: vec!["-c".to_string(), "echo hello; exit 3".to_string()],
            env: vec![("NETMOUNT_TEST".to_string(), "1".to_string())],
            uses_config_file: false,
        };

        let mut spawned =
            spawn_detached(Path::new("/bin/sh"), &invocation).expect("spawn shell");
        assert!(spawned.pid > 1);

        let mut out = String::new();
        spawned
            .stdout
            .take()
            .expect("stdout piped")
            .read_to_string(&mut out)
            .await
            .expect("read stdout");
        assert_eq!(out.trim(), "hello");

        let report = spawned.exit.await;
        assert_eq!(report.code, Some(3));
        assert!(!report.is_clean());
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let invocation = MountInvocation::default();
        let result = runtime.block_on(async {
            spawn_detached(Path::new("/nonexistent/netmount-rclone"), &invocation).map(|s| s.pid)
        });
        assert!(matches!(result, Err(SysError::SpawnFailed(_))));
    }
}
