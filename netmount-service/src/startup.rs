// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::supervisor::{StartOutcome, Supervisor};

pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

/// Start every configured mount after `delay`
///
/// Mounts in protected storage each wait for the device unlock inside their
/// own attempt, so they never hold back the others.
pub async fn autostart(supervisor: &Supervisor, delay: Duration) -> Vec<JoinHandle<()>> {
    if !delay.is_zero() {
        info!("Waiting {:?} for the system to settle before mounting", delay);
        tokio::time::sleep(delay).await;
    }

    let config = supervisor.config().get();
    let (protected, normal): (Vec<_>, Vec<_>) = config
        .mounts
        .into_iter()
        .partition(|mount| supervisor.gate().is_protected(mount.local_path()));

    info!(
        "Auto-mounting {} mount(s), {} in protected storage",
        normal.len() + protected.len(),
        protected.len()
    );

    normal
        .into_iter()
        .chain(protected)
        .filter_map(|mount| match supervisor.start(mount) {
            StartOutcome::Scheduled(handle) => Some(handle),
            StartOutcome::AlreadyActive | StartOutcome::Undeclared => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use netmount_types::{AppConfig, MountDefinition, MountType};

    use crate::test_support::{Harness, eventually};

    #[tokio::test]
    async fn protected_mounts_do_not_block_the_others() {
        let h = Harness::new();
        h.supervisor
            .apply_config(AppConfig::new(vec![
                MountDefinition::new("locked", MountType::Ftp, "host", h.path("protected/l")),
                MountDefinition::new("open", MountType::Ftp, "host", h.path("mnt/o")),
            ]))
            .unwrap();

        let handles = autostart(&h.supervisor, Duration::ZERO).await;
        assert_eq!(handles.len(), 2);

        let registry = h.supervisor.registry();
        assert!(eventually(|| registry.get("open").is_some_and(|s| s.is_mounted)).await);
        assert!(!registry.get("locked").unwrap().is_mounted);

        h.storage.unlocked.store(true, Ordering::SeqCst);
        for handle in handles {
            handle.await.expect("attempt task");
        }
        assert!(registry.get("locked").unwrap().is_mounted);
        assert_eq!(h.executor.spawn_count(), 2);
    }

    #[tokio::test]
    async fn empty_config_starts_nothing() {
        let h = Harness::new();
        assert!(autostart(&h.supervisor, Duration::ZERO).await.is_empty());
        assert_eq!(h.executor.spawn_count(), 0);
    }
}
