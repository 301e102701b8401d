// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountErrorKind {
    InvalidInput,
    NotFound,
    /// The mount is not running (stop of an unmounted or unknown mount)
    NotMounted,
    Unavailable,
    Internal,
}

impl MountErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::NotFound => 404,
            Self::NotMounted => 400,
            Self::Unavailable => 503,
            Self::Internal => 500,
        }
    }
}

/// Client-facing rejection of a facade request
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct MountError {
    pub kind: MountErrorKind,
    pub message: String,
}

impl MountError {
    pub fn new(kind: MountErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_mounted(name: &str) -> Self {
        Self::new(
            MountErrorKind::NotMounted,
            format!("Cannot unmount '{name}': not mounted or PID unknown"),
        )
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(
            MountErrorKind::NotFound,
            format!("No mount configuration named '{name}'"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_error_roundtrips() {
        let error = MountError::not_mounted("nas");
        let json = serde_json::to_string(&error).expect("serialize error");
        let parsed: MountError = serde_json::from_str(&json).expect("deserialize error");
        assert_eq!(parsed, error);
        assert_eq!(parsed.kind.code(), 400);
    }
}
