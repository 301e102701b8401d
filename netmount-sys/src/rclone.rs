// SPDX-License-Identifier: GPL-3.0-only

//! Low-level RClone CLI operations
//!
//! This module wraps the rclone command-line tool: spawning long-running
//! mounts, obscuring passwords, and probing configured remotes.

pub mod invocation;
pub mod obscure;
pub mod output;
pub mod sections;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use which::which;

use crate::error::{Result, SysError};
use crate::executor::MountExecutor;
use crate::process::{self, SpawnedMount};
use invocation::MountInvocation;

/// RClone CLI wrapper
pub struct RCloneCli {
    /// Path to the rclone binary
    binary_path: PathBuf,
}

impl RCloneCli {
    /// Wrap the rclone binary found in PATH
    pub fn new() -> Result<Self> {
        let binary_path = Self::find_rclone_binary()?;
        info!("Found rclone binary at {:?}", binary_path);
        Ok(Self { binary_path })
    }

    pub fn with_binary(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Prefer `preferred` when it exists, otherwise search PATH
    pub fn locate(preferred: Option<&Path>) -> Result<Self> {
        match preferred {
            Some(path) if path.is_file() => {
                info!("Using rclone binary at {:?}", path);
                Ok(Self::with_binary(path))
            }
            Some(path) => {
                warn!("rclone not found at {:?}, searching PATH", path);
                Self::new()
            }
            None => Self::new(),
        }
    }

    /// Find the rclone binary in PATH
    pub fn find_rclone_binary() -> Result<PathBuf> {
        which("rclone").map_err(|_| SysError::RCloneNotFound)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl MountExecutor for RCloneCli {
    fn spawn_mount(&self, invocation: &MountInvocation) -> Result<SpawnedMount> {
        info!(
            "Starting rclone mount {} -> {:?}",
            invocation.remote, invocation.mount_point
        );
        process::spawn_detached(&self.binary_path, invocation)
    }

    async fn obscure(&self, plaintext: &str) -> Result<String> {
        let output = Command::new(&self.binary_path)
            .arg("obscure")
            .arg(plaintext)
            .output()
            .await
            .map_err(|e| SysError::ObscureFailed(format!("Failed to execute rclone: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SysError::ObscureFailed(format!(
                "rclone obscure failed: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(SysError::ObscureFailed(
                "rclone obscure returned an empty result".to_string(),
            ));
        }

        Ok(token)
    }

    async fn probe_remote(&self, remote: &str, config_path: &Path) -> Result<String> {
        debug!("Probing remote {} with config {:?}", remote, config_path);

        let output = Command::new(&self.binary_path)
            .arg("lsd")
            .arg(remote)
            .arg("--config")
            .arg(config_path)
            .arg("--timeout")
            .arg("5s")
            .output()
            .await
            .map_err(|e| {
                SysError::OperationFailed(format!("Failed to execute rclone lsd: {}", e))
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(SysError::OperationFailed(format!(
                "rclone lsd {} failed ({}): {}",
                remote,
                output.status,
                combined.trim()
            )))
        }
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        process::terminate(pid)
    }
}

impl std::fmt::Debug for RCloneCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RCloneCli")
            .field("binary_path", &self.binary_path)
            .finish()
    }
}
