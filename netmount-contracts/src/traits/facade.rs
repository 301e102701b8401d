// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use netmount_types::{AppConfig, LogEntry, MountStatus};

use crate::MountError;

/// Operations a transport layer exposes to clients.
///
/// Start requests are accepted once scheduled; the outcome shows up in
/// [`MountFacade::status`] and the log.
#[async_trait]
pub trait MountFacade: Send + Sync {
    async fn status(&self) -> Result<Vec<MountStatus>, MountError>;

    async fn config(&self) -> Result<AppConfig, MountError>;

    async fn replace_config(&self, config: AppConfig) -> Result<(), MountError>;

    async fn start_mount(&self, name: &str) -> Result<(), MountError>;

    async fn stop_mount(&self, name: &str) -> Result<(), MountError>;

    async fn recent_logs(&self) -> Result<Vec<LogEntry>, MountError>;

    /// Environment check report produced before the daemon started
    async fn precheck_report(&self) -> Result<String, MountError>;
}
