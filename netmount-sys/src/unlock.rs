// SPDX-License-Identifier: GPL-3.0-only

//! Encrypted user storage detection
//!
//! User data regions stay encrypted until the device is unlocked after boot.
//! Mounting into them before that point always fails, so mounts targeting
//! these paths wait on [`UnlockGate::wait_until_accessible`] first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

/// Mount points under these prefixes live in protected storage
pub const PROTECTED_PREFIXES: &[&str] = &["/data/media/", "/storage/emulated/", "/sdcard/"];

/// Directories probed for write access, in order
pub const PROBE_DIRECTORIES: &[&str] = &["/data/media/0", "/storage/emulated/0", "/sdcard"];

/// Marker created and removed by the probe
pub const UNLOCK_MARKER: &str = ".netmount_unlock_test";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Kernel message for ENOKEY, the definitive "still locked" signal
const LOCKED_SIGNATURE: &str = "required key not available";

/// Filesystem access used by the gate
pub trait StorageProbe: Send + Sync {
    fn exists(&self, dir: &Path) -> bool;

    /// Create `marker` and remove it again
    fn touch_marker(&self, marker: &Path) -> std::io::Result<()>;
}

/// Probe backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl StorageProbe for FsProbe {
    fn exists(&self, dir: &Path) -> bool {
        dir.exists()
    }

    fn touch_marker(&self, marker: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(marker)?;
        drop(file);
        if let Err(e) = std::fs::remove_file(marker) {
            debug!("Failed to remove unlock marker {:?}: {}", marker, e);
        }
        Ok(())
    }
}

fn is_locked_error(error: &std::io::Error) -> bool {
    error.to_string().to_lowercase().contains(LOCKED_SIGNATURE)
}

/// Decides whether protected storage can be written yet
#[derive(Clone)]
pub struct UnlockGate {
    prefixes: Vec<String>,
    probe_dirs: Vec<PathBuf>,
    poll_interval: Duration,
    probe: Arc<dyn StorageProbe>,
}

impl Default for UnlockGate {
    fn default() -> Self {
        Self {
            prefixes: PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            probe_dirs: PROBE_DIRECTORIES.iter().map(PathBuf::from).collect(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe: Arc::new(FsProbe),
        }
    }
}

impl UnlockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, probe: Arc<dyn StorageProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_probe_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.probe_dirs = dirs;
        self
    }

    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether `path` lies in protected storage
    pub fn is_protected(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Probe the candidate directories for write access
    pub fn is_accessible(&self) -> bool {
        for dir in &self.probe_dirs {
            if !self.probe.exists(dir) {
                continue;
            }

            match self.probe.touch_marker(&dir.join(UNLOCK_MARKER)) {
                Ok(()) => {
                    info!("Device unlocked, {:?} is writable", dir);
                    return true;
                }
                Err(e) if is_locked_error(&e) => {
                    debug!("Encryption key unavailable at {:?}, device still locked", dir);
                    return false;
                }
                Err(e) => {
                    debug!("Probe of {:?} failed: {}", dir, e);
                }
            }
        }

        debug!("No user data path is writable, device still locked");
        false
    }

    /// Block the calling task until protected storage is writable
    ///
    /// There is deliberately no timeout.
    pub async fn wait_until_accessible(&self) {
        if self.check().await {
            return;
        }

        info!("Device locked, waiting for the user to unlock it...");
        let mut ticker = tokio::time::interval(self.poll_interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.check().await {
                info!("Device unlocked, user data is now accessible");
                return;
            }
            debug!("Still waiting for device unlock...");
        }
    }

    async fn check(&self) -> bool {
        let gate = self.clone();
        tokio::task::spawn_blocking(move || gate.is_accessible())
            .await
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for UnlockGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockGate")
            .field("prefixes", &self.prefixes)
            .field("probe_dirs", &self.probe_dirs)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
