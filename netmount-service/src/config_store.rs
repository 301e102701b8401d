// SPDX-License-Identifier: GPL-3.0-only

//! Persisted declarative mount configuration
//!
//! The on-disk JSON snapshot is the source of truth for which mounts exist.
//! Replacing it returns a [`ConfigDiff`] that drives reconciliation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use netmount_types::{AppConfig, MountDefinition};
use tracing::{debug, error, info};

use crate::error::{ConfigError, Result, ServiceError};

pub const DEFAULT_CONFIG_PATH: &str = "/data/adb/netmount/config.json";

/// Names affected by a configuration replacement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub retained: Vec<String>,
}

impl ConfigDiff {
    pub fn between(old: &AppConfig, new: &AppConfig) -> Self {
        let old_names: HashSet<&str> = old.names().collect();
        let new_names: HashSet<&str> = new.names().collect();

        Self {
            removed: old
                .names()
                .filter(|name| !new_names.contains(name))
                .map(str::to_string)
                .collect(),
            added: new
                .names()
                .filter(|name| !old_names.contains(name))
                .map(str::to_string)
                .collect(),
            retained: new
                .names()
                .filter(|name| old_names.contains(name))
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Owner of the active configuration snapshot
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<AppConfig>,
}

impl ConfigStore {
    /// Load the snapshot at `path`, creating an empty one when the file is absent
    pub fn load(path: impl Into<PathBuf>) -> std::result::Result<Self, ConfigError> {
        let path = path.into();

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config: AppConfig =
                serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            info!("Loaded {} mount definition(s) from {:?}", config.mounts.len(), path);
            config
        } else {
            info!("No config at {:?}, creating an empty one", path);
            let config = AppConfig::default();
            write_snapshot(&path, &config)?;
            config
        };

        Ok(Self {
            path,
            current: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the config file and the generated artifacts next to it
    pub fn data_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn get(&self) -> AppConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find(&self, name: &str) -> Option<MountDefinition> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(name)
            .cloned()
    }

    /// Swap in `config` and persist it
    ///
    /// An invalid snapshot is rejected and the active one stays untouched.
    /// The file is written while the write lock is held, so the persisted
    /// order of replacements matches the in-memory order. Persistence
    /// failures are logged; the in-memory snapshot stays authoritative.
    pub fn replace(&self, config: AppConfig) -> Result<ConfigDiff> {
        config.validate().map_err(ServiceError::InvalidArgument)?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let diff = ConfigDiff::between(&current, &config);

        match write_snapshot(&self.path, &config) {
            Ok(()) => debug!("Persisted config to {:?}", self.path),
            Err(e) => error!("{}", e),
        }
        *current = config;
        drop(current);

        info!(
            "Config replaced: {} added, {} removed, {} retained",
            diff.added.len(),
            diff.removed.len(),
            diff.retained.len()
        );
        Ok(diff)
    }
}

fn write_snapshot(path: &Path, config: &AppConfig) -> std::result::Result<(), ConfigError> {
    let write_error = |message: String| ConfigError::Write {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
    }

    let json = serde_json::to_string_pretty(config).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| write_error(e.to_string()))
}
