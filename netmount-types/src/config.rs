// SPDX-License-Identifier: GPL-3.0-only

use super::MountDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Full ordered set of mount definitions, persisted as the source of truth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mounts: Vec<MountDefinition>,
}

impl AppConfig {
    pub fn new(mounts: Vec<MountDefinition>) -> Self {
        Self { mounts }
    }

    pub fn find(&self, name: &str) -> Option<&MountDefinition> {
        self.mounts.iter().find(|mount| mount.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mounts.iter().map(|mount| mount.name.as_str())
    }

    /// Names must be non-empty and unique across the snapshot
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for mount in &self.mounts {
            if mount.name.trim().is_empty() {
                return Err("Mount name cannot be empty".to_string());
            }
            if !seen.insert(mount.name.as_str()) {
                return Err(format!("Duplicate mount name: {}", mount.name));
            }
        }
        Ok(())
    }
}
