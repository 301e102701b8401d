// SPDX-License-Identifier: GPL-3.0-only

//! Concurrency-safe map of mount name to runtime status
//!
//! Entries exist only for declared mounts: they are created by [`MountRegistry::ensure`]
//! and a start of a name without an entry is refused.
//!
//! Each start attempt receives an attempt number. Writes coming from an
//! attempt only apply while that attempt still owns the entry, and exit
//! notifications only apply while the entry still records the same attempt
//! and pid. This keeps a stale process from clobbering the status of its successor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use netmount_types::{MountState, MountStatus};
use tracing::debug;

use crate::error::{Result, ServiceError};

/// Outcome of asking to start a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTicket {
    /// The mount is starting or mounted already
    AlreadyActive(MountState),
    /// No entry exists, the mount is not declared
    Undeclared,
    /// The caller owns the entry until it reports success or failure
    Granted { attempt: u64 },
}

#[derive(Debug, Clone)]
struct Entry {
    status: MountStatus,
    attempt: u64,
}

impl Entry {
    fn new(name: &str) -> Self {
        Self {
            status: MountStatus::new(name),
            attempt: 0,
        }
    }

    fn reset(&mut self) {
        self.status.state = MountState::Unmounted;
        self.status.is_mounted = false;
        self.status.pid = None;
    }
}

#[derive(Debug, Default)]
pub struct MountRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    next_attempt: AtomicU64,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an unmounted entry for `name` unless one exists
    pub fn ensure(&self, name: &str) {
        self.write()
            .entry(name.to_string())
            .or_insert_with(|| Entry::new(name));
    }

    pub fn begin_start(&self, name: &str) -> StartTicket {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(name) else {
            return StartTicket::Undeclared;
        };

        if entry.status.state.is_active() {
            return StartTicket::AlreadyActive(entry.status.state);
        }

        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed) + 1;
        entry.attempt = attempt;
        entry.status.state = MountState::Starting;
        entry.status.is_mounted = false;
        entry.status.error = None;
        entry.status.pid = None;
        StartTicket::Granted { attempt }
    }

    /// Whether `attempt` still owns the entry for `name`
    pub fn is_current(&self, name: &str, attempt: u64) -> bool {
        self.read()
            .get(name)
            .is_some_and(|entry| entry.attempt == attempt)
    }

    pub fn set_mounted(&self, name: &str, attempt: u64, pid: u32) -> bool {
        let mut entries = self.write();
        match entries.get_mut(name) {
            Some(entry) if entry.attempt == attempt && entry.status.state == MountState::Starting => {
                entry.status.state = MountState::Mounted;
                entry.status.is_mounted = true;
                entry.status.pid = Some(pid);
                entry.status.error = None;
                true
            }
            _ => {
                debug!("Attempt {} no longer owns '{}', ignoring pid {}", attempt, name, pid);
                false
            }
        }
    }

    pub fn set_error(&self, name: &str, attempt: u64, message: impl Into<String>) -> bool {
        let mut entries = self.write();
        match entries.get_mut(name) {
            Some(entry) if entry.attempt == attempt && entry.status.state == MountState::Starting => {
                entry.reset();
                entry.status.error = Some(message.into());
                true
            }
            _ => false,
        }
    }

    /// Move a running mount to `stopping` and hand back the pid to signal
    pub fn begin_stop(&self, name: &str) -> Result<u32> {
        let mut entries = self.write();
        match entries.get_mut(name) {
            Some(entry) if entry.status.state == MountState::Mounted => match entry.status.pid {
                Some(pid) => {
                    entry.status.state = MountState::Stopping;
                    Ok(pid)
                }
                None => Err(ServiceError::NotMounted(name.to_string())),
            },
            _ => Err(ServiceError::NotMounted(name.to_string())),
        }
    }

    /// Settle a stop of `pid` as unmounted
    pub fn finish_stop(&self, name: &str, pid: u32) -> bool {
        let mut entries = self.write();
        match entries.get_mut(name) {
            Some(entry) if entry.status.pid == Some(pid) => {
                entry.reset();
                entry.status.error = None;
                true
            }
            _ => false,
        }
    }

    /// Record that process `pid`, spawned by `attempt`, has exited
    ///
    /// Ignored unless the entry still records that attempt and pid.
    pub fn mark_exited(&self, name: &str, attempt: u64, pid: u32) -> bool {
        let mut entries = self.write();
        match entries.get_mut(name) {
            Some(entry) if entry.attempt == attempt && entry.status.pid == Some(pid) => {
                entry.reset();
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, name: &str) -> Option<MountStatus> {
        self.write().remove(name).map(|entry| entry.status)
    }

    pub fn get(&self, name: &str) -> Option<MountStatus> {
        self.read().get(name).map(|entry| entry.status.clone())
    }

    /// Copies of every status, sorted by name
    pub fn snapshot(&self) -> Vec<MountStatus> {
        let mut statuses: Vec<_> = self.read().values().map(|e| e.status.clone()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(ticket: StartTicket) -> u64 {
        match ticket {
            StartTicket::Granted { attempt } => attempt,
            other => panic!("expected a granted ticket, got {other:?}"),
        }
    }

    fn declared(names: &[&str]) -> MountRegistry {
        let registry = MountRegistry::new();
        for name in names {
            registry.ensure(name);
        }
        registry
    }

    #[test]
    fn start_of_undeclared_name_is_refused() {
        let registry = MountRegistry::new();

        assert_eq!(registry.begin_start("ghost"), StartTicket::Undeclared);
        assert!(registry.get("ghost").is_none());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn start_is_refused_while_active() {
        let registry = declared(&["a"]);
        let attempt = granted(registry.begin_start("a"));

        assert_eq!(
            registry.begin_start("a"),
            StartTicket::AlreadyActive(MountState::Starting)
        );
        assert!(registry.set_mounted("a", attempt, 42));
        assert_eq!(
            registry.begin_start("a"),
            StartTicket::AlreadyActive(MountState::Mounted)
        );
    }

    #[test]
    fn failure_clears_pid_and_records_error() {
        let registry = declared(&["a"]);
        let attempt = granted(registry.begin_start("a"));

        assert!(registry.set_error("a", attempt, "spawn failed"));

        let status = registry.get("a").unwrap();
        assert_eq!(status.state, MountState::Unmounted);
        assert!(!status.is_mounted);
        assert_eq!(status.error.as_deref(), Some("spawn failed"));

        // A new attempt clears the previous error
        granted(registry.begin_start("a"));
        assert_eq!(registry.get("a").unwrap().error, None);
    }

    #[test]
    fn stale_exit_does_not_clear_successor() {
        let registry = declared(&["a"]);
        let first = granted(registry.begin_start("a"));
        registry.set_mounted("a", first, 100);
        assert_eq!(registry.begin_stop("a").unwrap(), 100);
        assert!(registry.finish_stop("a", 100));

        let second = granted(registry.begin_start("a"));
        registry.set_mounted("a", second, 200);

        assert!(!registry.mark_exited("a", first, 100));
        // A recycled pid reported by the old attempt is still stale
        assert!(!registry.mark_exited("a", first, 200));
        let status = registry.get("a").unwrap();
        assert!(status.is_mounted);
        assert_eq!(status.pid, Some(200));

        assert!(registry.mark_exited("a", second, 200));
        assert_eq!(registry.get("a").unwrap().pid, None);
    }

    #[test]
    fn superseded_attempt_cannot_write() {
        let registry = declared(&["a"]);
        let old = granted(registry.begin_start("a"));
        registry.remove("a");
        assert_eq!(registry.begin_start("a"), StartTicket::Undeclared);
        registry.ensure("a");
        let new = granted(registry.begin_start("a"));

        assert!(!registry.is_current("a", old));
        assert!(registry.is_current("a", new));
        assert!(!registry.set_mounted("a", old, 7));
        assert!(!registry.set_error("a", old, "late"));
        assert_eq!(registry.get("a").unwrap().state, MountState::Starting);
    }

    #[test]
    fn stop_requires_a_mounted_pid() {
        let registry = declared(&["a"]);

        assert!(matches!(
            registry.begin_stop("a"),
            Err(ServiceError::NotMounted(_))
        ));
        assert!(matches!(
            registry.begin_stop("missing"),
            Err(ServiceError::NotMounted(_))
        ));
    }
}
