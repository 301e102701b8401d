// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::process::SpawnedMount;
use crate::rclone::invocation::MountInvocation;

/// Boundary to the external mount executor.
///
/// Everything the supervisor needs from rclone goes through this trait:
/// spawning a long-running mount, obscuring a secret, probing a configured
/// remote, and terminating a mount process.
#[async_trait]
pub trait MountExecutor: Send + Sync {
    /// Start the executor as a detached child and hand back its pid and pipes
    fn spawn_mount(&self, invocation: &MountInvocation) -> Result<SpawnedMount>;

    /// Turn a plaintext secret into the executor's obscured form
    async fn obscure(&self, plaintext: &str) -> Result<String>;

    /// Quick connectivity check against a named remote, returns the tool output
    async fn probe_remote(&self, remote: &str, config_path: &Path) -> Result<String>;

    /// Graceful termination, escalating to a forceful kill when signalling fails
    fn terminate(&self, pid: u32) -> Result<()>;
}
