// SPDX-License-Identifier: GPL-3.0-only

//! Named sections of the rclone configuration file
//!
//! The file is treated as a section store: load it whole, replace one section
//! by name, write it whole. Replacing the same section twice leaves a single
//! copy holding the latest values.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use configparser::ini::Ini;
use tracing::{debug, info, warn};

use crate::error::{Result, SysError};

const GENERATED_HEADER: &str = "# rclone configuration - generated by NetMount\n\
# Holds the named sections used by the mount supervisor\n\n";

/// The rclone configuration file shared by all section-based mounts
#[derive(Debug)]
pub struct SectionFile {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl SectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with a header when absent, returns whether it was created
    pub fn ensure_exists(&self) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.path.exists() {
            debug!("rclone config already present at {:?}", self.path);
            return Ok(false);
        }

        self.create_parent()?;
        std::fs::write(&self.path, GENERATED_HEADER)?;
        info!("Created rclone config at {:?}", self.path);
        Ok(true)
    }

    /// Names of all sections in file order
    pub fn sections(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let ini = self.load()?;
        Ok(ini.get_map_ref().keys().cloned().collect())
    }

    /// Key/value pairs of one section, `None` when the section does not exist
    pub fn section(&self, name: &str) -> Result<Option<Vec<(String, String)>>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let ini = self.load()?;
        Ok(ini.get_map_ref().get(name).map(|properties| {
            properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone().unwrap_or_default()))
                .collect()
        }))
    }

    /// Drop any existing section called `name` and write a fresh one
    ///
    /// Returns whether a previous section was replaced.
    pub fn replace_section(&self, name: &str, entries: &[(String, String)]) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ini = self.load()?;
        let replaced = ini.remove_section(name).is_some();
        if replaced {
            debug!("Removed previous section '{}'", name);
        }

        for (key, value) in entries {
            ini.set(name, key, Some(value.clone()));
        }

        self.store(&ini)?;
        info!("Wrote rclone section '{}' to {:?}", name, self.path);
        Ok(replaced)
    }

    fn load(&self) -> Result<Ini> {
        let mut ini = parser();

        if !self.path.exists() {
            return Ok(ini);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            SysError::ConfigParse(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(ini);
        }

        ini.read(content).map_err(|e| {
            warn!("Failed to parse rclone config {:?}: {}", self.path, e);
            SysError::ConfigParse(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(ini)
    }

    fn store(&self, ini: &Ini) -> Result<()> {
        self.create_parent()?;
        let mut content = String::from(GENERATED_HEADER);
        content.push_str(&ini.writes());
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn create_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SysError::OperationFailed(format!("Failed to create config directory: {}", e))
                })?;
            }
        }
        Ok(())
    }
}

/// Case-sensitive parser that only honours full-line comments
///
/// Secrets routinely contain `#` and `;`, so inline comments are disabled.
fn parser() -> Ini {
    let mut defaults = Ini::new_cs().defaults();
    defaults.enable_inline_comments = false;
    Ini::new_from_defaults(defaults)
}
