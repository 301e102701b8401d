// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use async_trait::async_trait;
use netmount_contracts::{MountError, MountFacade};
use netmount_types::{AppConfig, LogEntry, MountStatus};
use tracing::info;

use crate::error::ServiceError;
use crate::log_sink::LogSink;
use crate::supervisor::Supervisor;

/// Report written by the environment check that runs before the daemon
pub const PRECHECK_FILE: &str = "precheck.log";

/// [`MountFacade`] backed by the supervisor and the in-memory log
#[derive(Debug, Clone)]
pub struct MountService {
    supervisor: Supervisor,
    logs: Arc<LogSink>,
}

impl MountService {
    pub fn new(supervisor: Supervisor, logs: Arc<LogSink>) -> Self {
        Self { supervisor, logs }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}

#[async_trait]
impl MountFacade for MountService {
    async fn status(&self) -> Result<Vec<MountStatus>, MountError> {
        Ok(self.supervisor.registry().snapshot())
    }

    async fn config(&self) -> Result<AppConfig, MountError> {
        Ok(self.supervisor.config().get())
    }

    async fn replace_config(&self, config: AppConfig) -> Result<(), MountError> {
        info!("Received new configuration with {} mount(s)", config.mounts.len());
        self.supervisor.apply_config(config)?;
        Ok(())
    }

    async fn start_mount(&self, name: &str) -> Result<(), MountError> {
        info!("Start requested for '{}'", name);
        self.supervisor.start_by_name(name)?;
        Ok(())
    }

    async fn stop_mount(&self, name: &str) -> Result<(), MountError> {
        info!("Stop requested for '{}'", name);
        Ok(self.supervisor.stop(name)?)
    }

    async fn recent_logs(&self) -> Result<Vec<LogEntry>, MountError> {
        Ok(self.logs.entries())
    }

    async fn precheck_report(&self) -> Result<String, MountError> {
        let path = self.supervisor.data_dir().join(PRECHECK_FILE);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            ServiceError::Unavailable(format!("Cannot read {}: {}", path.display(), e)).into()
        })
    }
}
