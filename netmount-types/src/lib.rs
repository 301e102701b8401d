// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for NetMount
//!
//! These types are shared by the whole stack:
//!
//! - **netmount-sys**: builds rclone invocations from [`MountDefinition`]
//! - **netmount-service**: persists [`AppConfig`] and reports [`MountStatus`]
//! - **netmount-contracts**: exposes them through the facade contract
//!
//! JSON field names follow the persisted configuration file, so a snapshot written
//! by any client round-trips unchanged.

pub mod config;
pub mod log;
pub mod mount;
pub mod status;

pub use config::AppConfig;
pub use log::LogEntry;
pub use mount::{AuthMode, MountDefinition, MountType};
pub use status::{MountState, MountStatus};
