// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rclone binary not found")]
    RCloneNotFound,

    #[error("Failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("Failed to obscure secret: {0}")]
    ObscureFailed(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Failed to signal process {pid}: {message}")]
    SignalFailed { pid: u32, message: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
