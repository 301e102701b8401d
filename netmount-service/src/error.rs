// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use netmount_contracts::{MountError, MountErrorKind};
use netmount_sys::SysError;
use thiserror::Error;

/// Failures reading or writing the persisted mount configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

/// Service-specific errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Mount not found: {0}")]
    NotFound(String),

    #[error("Cannot unmount '{0}': not mounted or PID unknown")]
    NotMounted(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sys(#[from] SysError),
}

impl From<ServiceError> for MountError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(name) => MountError::not_found(&name),
            ServiceError::NotMounted(name) => MountError::not_mounted(&name),
            ServiceError::InvalidArgument(msg) => MountError::new(MountErrorKind::InvalidInput, msg),
            ServiceError::Unavailable(msg) => MountError::new(MountErrorKind::Unavailable, msg),
            other => MountError::new(MountErrorKind::Internal, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
