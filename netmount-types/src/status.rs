// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// Lifecycle phase of one supervised mount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountState {
    #[default]
    Unmounted,
    Starting,
    Mounted,
    Stopping,
}

impl MountState {
    /// A start request is ignored while the mount is in one of these phases
    pub fn is_active(&self) -> bool {
        matches!(self, MountState::Starting | MountState::Mounted)
    }
}

impl std::fmt::Display for MountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountState::Unmounted => write!(f, "unmounted"),
            MountState::Starting => write!(f, "starting"),
            MountState::Mounted => write!(f, "mounted"),
            MountState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Reported status of one mount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountStatus {
    pub name: String,
    pub is_mounted: bool,
    #[serde(default)]
    pub state: MountState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl MountStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_empty_error_and_pid() {
        let status = MountStatus::new("a");
        let json = serde_json::to_value(&status).expect("serialize status");
        assert_eq!(json["isMounted"], false);
        assert_eq!(json["state"], "unmounted");
        assert!(json.get("error").is_none());
        assert!(json.get("pid").is_none());
    }
}
