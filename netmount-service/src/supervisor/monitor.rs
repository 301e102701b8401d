// SPDX-License-Identifier: GPL-3.0-only

//! Background tasks attached to a running mount process
//!
//! Each task captures only the mount name and pid it was started for, never a
//! reference into the registry entry, so it cannot act on a successor process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use netmount_sys::rclone::output::{LineSeverity, StreamKind, classify_line};
use netmount_sys::{ExitReport, OutputStream};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::registry::MountRegistry;

/// Route every line of `stream` into the log
pub(crate) fn spawn_output_reader(
    name: String,
    kind: StreamKind,
    stream: OutputStream,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => log_line(&name, kind, &line),
                Ok(None) => break,
                Err(e) => {
                    debug!("Reading {} of '{}' failed: {}", kind, name, e);
                    break;
                }
            }
        }
    })
}

fn log_line(name: &str, kind: StreamKind, line: &str) {
    match classify_line(kind, line) {
        LineSeverity::Error => error!("[{}] {}", name, line),
        LineSeverity::Warning => warn!("[{}] {}", name, line),
        LineSeverity::Notice => info!("[{}] notice: {}", name, line),
        LineSeverity::Info | LineSeverity::Plain => info!("[{}] {}", name, line),
        severity @ LineSeverity::Debug => info!("[{}] {}: {}", name, severity.tag(), line),
    }
}

/// Clear the registry entry once `pid` exits, if attempt and pid still own it
pub(crate) fn spawn_exit_watcher(
    registry: Arc<MountRegistry>,
    name: String,
    attempt: u64,
    pid: u32,
    exit: BoxFuture<'static, ExitReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let report = exit.await;

        if !registry.mark_exited(&name, attempt, pid) {
            debug!(
                "Exit of stale process {} for '{}' ignored ({})",
                pid, name, report.detail
            );
            return;
        }

        if report.is_clean() {
            info!("Mount process '{}' (PID {}) exited normally", name, pid);
        } else {
            error!(
                "Mount process '{}' (PID {}) exited abnormally: {}",
                name, pid, report.detail
            );
        }
    })
}

/// Inspect the mount point once the executor had time to settle
///
/// Purely diagnostic, never changes state.
pub(crate) fn spawn_verification(
    name: String,
    mount_point: PathBuf,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut dir = match tokio::fs::read_dir(&mount_point).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Cannot read mount point {:?} of '{}': {}", mount_point, name, e);
                return;
            }
        };

        let mut count = 0usize;
        while let Ok(Some(_)) = dir.next_entry().await {
            count += 1;
        }

        if count == 0 {
            warn!(
                "Mount point {:?} of '{}' is empty. Possible causes:",
                mount_point, name
            );
            warn!("  1. Network connectivity problems");
            warn!("  2. Authentication failure (check user name and password)");
            warn!("  3. The remote path does not exist");
            warn!("  4. Wrong SMB share name");
        } else {
            info!(
                "Mount '{}' verified, {} entries visible at {:?}",
                name, count, mount_point
            );
        }
    })
}
