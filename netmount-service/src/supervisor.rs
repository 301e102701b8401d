// SPDX-License-Identifier: GPL-3.0-only

//! Mount lifecycle supervisor
//!
//! Drives each mount through `unmounted -> starting -> mounted -> stopping`.
//! A start request spawns one task per attempt; that task waits on the unlock
//! gate when needed, prepares the executor invocation, spawns the executor,
//! and hands the running process to the monitor tasks.

mod monitor;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use netmount_sys::rclone::invocation::{
    InvocationContext, build_invocation, smb_section_entries, smb_section_name, split_smb_remote,
};
use netmount_sys::rclone::obscure::obscure_or_plaintext;
use netmount_sys::rclone::output::StreamKind;
use netmount_sys::{MountDefaults, MountExecutor, SectionFile, SysError, UnlockGate};
use netmount_types::{AppConfig, MountDefinition, MountType};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config_store::{ConfigDiff, ConfigStore};
use crate::error::{Result, ServiceError};
use crate::registry::{MountRegistry, StartTicket};

/// File name of the rclone configuration kept next to the mount config
pub const RCLONE_CONFIG_FILE: &str = "rclone.conf";

pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(5);

/// Tunables of the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Delay before a fresh mount point is inspected
    pub verify_delay: Duration,
    pub defaults: MountDefaults,
    pub gate: UnlockGate,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            verify_delay: DEFAULT_VERIFY_DELAY,
            defaults: MountDefaults::default(),
            gate: UnlockGate::default(),
        }
    }
}

/// Result of a start request
#[derive(Debug)]
pub enum StartOutcome {
    /// The mount is starting or mounted, nothing was done
    AlreadyActive,
    /// An attempt task was spawned
    Scheduled(JoinHandle<()>),
    /// The name is not in the active configuration, nothing was done
    Undeclared,
}

struct Inner {
    config: Arc<ConfigStore>,
    registry: Arc<MountRegistry>,
    executor: Arc<dyn MountExecutor>,
    sections: SectionFile,
    data_dir: PathBuf,
    settings: SupervisorSettings,
    /// Serializes configuration replacement with reconciliation
    apply_lock: Mutex<()>,
}

#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Create a supervisor with a registry entry for every configured mount
    pub fn new(
        config: Arc<ConfigStore>,
        executor: Arc<dyn MountExecutor>,
        settings: SupervisorSettings,
    ) -> Self {
        let registry = Arc::new(MountRegistry::new());
        for name in config.get().names() {
            registry.ensure(name);
        }

        let data_dir = config.data_dir();
        let sections = SectionFile::new(data_dir.join(RCLONE_CONFIG_FILE));

        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                executor,
                sections,
                data_dir,
                settings,
                apply_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    pub fn registry(&self) -> &MountRegistry {
        &self.inner.registry
    }

    pub fn gate(&self) -> &UnlockGate {
        &self.inner.settings.gate
    }

    pub fn sections(&self) -> &SectionFile {
        &self.inner.sections
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// Schedule a start of `definition` unless it is already starting or mounted
    pub fn start(&self, definition: MountDefinition) -> StartOutcome {
        let name = definition.name.clone();

        match self.inner.registry.begin_start(&name) {
            StartTicket::AlreadyActive(state) => {
                info!("Mount '{}' is already {}, ignoring start request", name, state);
                StartOutcome::AlreadyActive
            }
            StartTicket::Undeclared => {
                warn!("Mount '{}' is not configured, ignoring start request", name);
                StartOutcome::Undeclared
            }
            StartTicket::Granted { attempt } => {
                debug!("Scheduling attempt {} for '{}'", attempt, name);
                let supervisor = self.clone();
                StartOutcome::Scheduled(tokio::spawn(async move {
                    supervisor.run_attempt(definition, attempt).await;
                }))
            }
        }
    }

    async fn run_attempt(&self, definition: MountDefinition, attempt: u64) {
        let name = definition.name.clone();

        if let Err(e) = self.mount(&definition, attempt).await {
            let message = e.to_string();
            if self.inner.registry.set_error(&name, attempt, message.clone()) {
                error!("Mount '{}' failed: {}", name, message);
            } else {
                debug!("Failure of superseded attempt for '{}': {}", name, message);
            }
        }
    }

    async fn mount(&self, definition: &MountDefinition, attempt: u64) -> Result<()> {
        let name = definition.name.as_str();
        let registry = &self.inner.registry;
        let gate = &self.inner.settings.gate;

        if gate.is_protected(definition.local_path()) {
            info!(
                "Mount '{}' targets protected storage {:?}, checking device unlock",
                name,
                definition.local_path()
            );
            gate.wait_until_accessible().await;

            if !registry.is_current(name, attempt) {
                info!("Mount '{}' was removed while waiting for unlock, skipping", name);
                return Ok(());
            }
        }

        info!("Mounting '{}' ({}) at {:?}", name, definition.mount_type, definition.local_path());

        tokio::fs::create_dir_all(definition.local_path())
            .await
            .map_err(|e| {
                SysError::OperationFailed(format!(
                    "Failed to create mount point {}: {}",
                    definition.local_path().display(),
                    e
                ))
            })?;

        if definition.mount_type == MountType::Smb {
            self.prepare_smb_section(definition).await?;
        }

        let ctx = InvocationContext {
            config_path: self.inner.sections.path(),
            home_dir: &self.inner.data_dir,
            defaults: &self.inner.settings.defaults,
        };
        let invocation = build_invocation(definition, &ctx);
        debug!("rclone {}", invocation.args.join(" "));

        let mut spawned = self.inner.executor.spawn_mount(&invocation)?;
        let pid = spawned.pid;

        if !registry.set_mounted(name, attempt, pid) {
            warn!(
                "Mount '{}' changed while starting, terminating new process {}",
                name, pid
            );
            if let Err(e) = self.inner.executor.terminate(pid) {
                warn!("Failed to terminate orphaned process {}: {}", pid, e);
            }
            tokio::spawn(spawned.exit);
            return Ok(());
        }

        info!("Mount '{}' started with PID {}", name, pid);

        if let Some(stdout) = spawned.stdout.take() {
            monitor::spawn_output_reader(name.to_string(), StreamKind::Stdout, stdout);
        }
        if let Some(stderr) = spawned.stderr.take() {
            monitor::spawn_output_reader(name.to_string(), StreamKind::Stderr, stderr);
        }
        monitor::spawn_exit_watcher(
            self.inner.registry.clone(),
            name.to_string(),
            attempt,
            pid,
            spawned.exit,
        );
        monitor::spawn_verification(
            name.to_string(),
            definition.local_path.clone(),
            self.inner.settings.verify_delay,
        );

        Ok(())
    }

    /// Write the named rclone section for an SMB mount and probe it
    async fn prepare_smb_section(&self, definition: &MountDefinition) -> Result<()> {
        let remote = split_smb_remote(&definition.remote_address);
        let section = smb_section_name(&definition.name);
        let password = obscure_or_plaintext(self.inner.executor.as_ref(), &definition.secret).await;

        let entries = smb_section_entries(definition, &remote.host, &password);
        self.inner
            .sections
            .replace_section(&section, &entries)
            .map_err(|e| {
                SysError::OperationFailed(format!(
                    "Failed to write rclone section '{}': {}",
                    section, e
                ))
            })?;

        match self
            .inner
            .executor
            .probe_remote(&format!("{section}:"), self.inner.sections.path())
            .await
        {
            Ok(output) => {
                info!("Connectivity check for '{}' succeeded", definition.name);
                if !output.trim().is_empty() {
                    debug!("{}", output.trim());
                }
            }
            Err(e) => warn!("Connectivity check for '{}' failed: {}", definition.name, e),
        }

        Ok(())
    }

    /// Signal the process of a mounted `name` and mark it unmounted
    ///
    /// Fails with `NotMounted` and sends nothing unless the mount is running.
    pub fn stop(&self, name: &str) -> Result<()> {
        let pid = match self.inner.registry.begin_stop(name) {
            Ok(pid) => pid,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        info!("Stopping mount '{}' (PID {})", name, pid);
        if let Err(e) = self.inner.executor.terminate(pid) {
            warn!("Failed to signal mount '{}' (PID {}): {}", name, pid, e);
        }

        self.inner.registry.finish_stop(name, pid);
        info!("Stop signal sent to '{}'", name);
        Ok(())
    }

    /// Bring the registry in line with the active configuration
    ///
    /// Statuses of names that are no longer declared are dropped, stopping
    /// their process first when mounted. Every declared name gets an entry.
    pub fn reconcile(&self, diff: &ConfigDiff) {
        let config = self.inner.config.get();

        for status in self.inner.registry.snapshot() {
            if config.contains(&status.name) {
                continue;
            }
            if status.is_mounted {
                info!("Mount '{}' was removed from config, stopping it", status.name);
                if let Err(e) = self.stop(&status.name) {
                    warn!("Stopping removed mount '{}' failed: {}", status.name, e);
                }
            }
            self.inner.registry.remove(&status.name);
            debug!("Dropped status of '{}'", status.name);
        }

        for name in config.names() {
            self.inner.registry.ensure(name);
        }

        if diff.is_empty() {
            debug!("Config change left the set of mounts unchanged");
        }
    }

    /// Replace the active configuration and reconcile the registry with it
    ///
    /// Replacements are serialized, so the persisted file, the in-memory
    /// snapshot and the registry always describe the same mount set.
    pub fn apply_config(&self, config: AppConfig) -> Result<ConfigDiff> {
        let _guard = self
            .inner
            .apply_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let diff = self.inner.config.replace(config)?;
        self.reconcile(&diff);
        Ok(diff)
    }

    /// Start a configured mount by name
    pub fn start_by_name(&self, name: &str) -> Result<StartOutcome> {
        let definition = self
            .inner
            .config
            .find(name)
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;
        match self.start(definition) {
            StartOutcome::Undeclared => Err(ServiceError::NotFound(name.to_string())),
            outcome => Ok(outcome),
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("data_dir", &self.inner.data_dir)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}
