// SPDX-License-Identifier: GPL-3.0-only

//! NetMount mount supervisor
//!
//! Keeps a declaratively configured set of rclone mounts running:
//! - [`ConfigStore`] owns the persisted mount list
//! - [`MountRegistry`] tracks the runtime status of every mount
//! - [`Supervisor`] starts, monitors and stops mount processes
//! - [`MountService`] exposes all of it through the [`MountFacade`] contract
//!
//! [`MountFacade`]: netmount_contracts::MountFacade

pub mod cli;
pub mod config_store;
pub mod error;
pub mod facade;
pub mod log_sink;
pub mod logging;
pub mod registry;
pub mod startup;
pub mod supervisor;

#[cfg(test)]
mod test_support;

pub use config_store::{ConfigDiff, ConfigStore};
pub use error::{ConfigError, Result, ServiceError};
pub use facade::MountService;
pub use log_sink::{LogSink, LogSinkLayer};
pub use registry::{MountRegistry, StartTicket};
pub use supervisor::{StartOutcome, Supervisor, SupervisorSettings};
