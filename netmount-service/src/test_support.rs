// SPDX-License-Identifier: GPL-3.0-only

//! Fakes shared by the service tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netmount_sys::{
    ExitReport, MountExecutor, MountInvocation, OutputStream, SpawnedMount, StorageProbe, SysError,
    UnlockGate,
};
use tokio::sync::oneshot;

use netmount_types::{AppConfig, MountDefinition};

use crate::config_store::ConfigStore;
use crate::supervisor::{Supervisor, SupervisorSettings};

/// Executor that records every call and lets the test decide when processes exit
pub struct FakeExecutor {
    next_pid: AtomicU32,
    pub fail_spawn: AtomicBool,
    pub fail_obscure: AtomicBool,
    pub stderr_text: Mutex<String>,
    pub spawned: Mutex<Vec<MountInvocation>>,
    pub terminated: Mutex<Vec<u32>>,
    pub probed: Mutex<Vec<String>>,
    /// Runs once inside the next successful spawn, before it returns
    pub on_spawn: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    exits: Mutex<HashMap<u32, oneshot::Sender<ExitReport>>>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self {
            next_pid: AtomicU32::new(1000),
            fail_spawn: AtomicBool::new(false),
            fail_obscure: AtomicBool::new(false),
            stderr_text: Mutex::new(String::new()),
            spawned: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
            probed: Mutex::new(Vec::new()),
            on_spawn: Mutex::new(None),
            exits: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeExecutor {
    /// Make process `pid` exit with `code`
    pub fn exit(&self, pid: u32, code: i32) {
        if let Some(sender) = self.exits.lock().unwrap().remove(&pid) {
            let _ = sender.send(ExitReport::new(Some(code), format!("exit status: {code}")));
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn last_invocation(&self) -> MountInvocation {
        self.spawned
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("at least one spawn")
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }
}

#[async_trait]
impl MountExecutor for FakeExecutor {
    fn spawn_mount(&self, invocation: &MountInvocation) -> netmount_sys::Result<SpawnedMount> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(SysError::SpawnFailed("executable not found".to_string()));
        }

        self.spawned.lock().unwrap().push(invocation.clone());
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.exits.lock().unwrap().insert(pid, tx);

        let hook = self.on_spawn.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }

        let stderr = self.stderr_text.lock().unwrap().clone();
        Ok(SpawnedMount {
            pid,
            stdout: Some(Box::pin(std::io::Cursor::new(Vec::new())) as OutputStream),
            stderr: Some(Box::pin(std::io::Cursor::new(stderr.into_bytes())) as OutputStream),
            exit: Box::pin(async move {
                rx.await
                    .unwrap_or_else(|_| ExitReport::new(None, "executor dropped"))
            }),
        })
    }

    async fn obscure(&self, plaintext: &str) -> netmount_sys::Result<String> {
        if self.fail_obscure.load(Ordering::SeqCst) {
            return Err(SysError::ObscureFailed("not installed".to_string()));
        }
        Ok(format!("obscured:{plaintext}"))
    }

    async fn probe_remote(&self, remote: &str, _config_path: &Path) -> netmount_sys::Result<String> {
        self.probed.lock().unwrap().push(remote.to_string());
        Ok(String::new())
    }

    fn terminate(&self, pid: u32) -> netmount_sys::Result<()> {
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}

/// Storage that stays locked until the test flips it
#[derive(Default)]
pub struct LockedStorage {
    pub unlocked: AtomicBool,
}

impl StorageProbe for LockedStorage {
    fn exists(&self, _dir: &Path) -> bool {
        true
    }

    fn touch_marker(&self, _marker: &Path) -> std::io::Result<()> {
        if self.unlocked.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(std::io::Error::other("Required key not available"))
        }
    }
}

/// A supervisor over a scratch directory with fake collaborators
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub executor: Arc<FakeExecutor>,
    pub storage: Arc<LockedStorage>,
    pub supervisor: Supervisor,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let executor = Arc::new(FakeExecutor::default());
        let storage = Arc::new(LockedStorage::default());

        let protected = format!("{}/", dir.path().join("protected").display());
        let gate = UnlockGate::new()
            .with_probe(storage.clone())
            .with_probe_dirs(vec![dir.path().join("protected")])
            .with_prefixes(vec![protected])
            .with_poll_interval(Duration::from_millis(10));

        let store = ConfigStore::load(dir.path().join("config.json")).expect("load config");
        let settings = SupervisorSettings {
            verify_delay: Duration::from_millis(10),
            gate,
            ..Default::default()
        };
        let supervisor = Supervisor::new(Arc::new(store), executor.clone(), settings);

        Self {
            dir,
            executor,
            storage,
            supervisor,
        }
    }

    /// Make `mounts` the active configuration
    pub fn declare(&self, mounts: Vec<MountDefinition>) {
        self.supervisor
            .apply_config(AppConfig::new(mounts))
            .expect("apply config");
    }

    /// Mount point under the scratch directory
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Poll `condition` until it holds or a generous deadline passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
