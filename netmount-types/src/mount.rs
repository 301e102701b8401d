// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Protocol used to reach a remote.
///
/// The known protocols get dedicated invocation handling; anything else is
/// carried verbatim and passed to rclone as a named remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MountType {
    #[default]
    Smb,
    Ftp,
    Webdav,
    Other(String),
}

impl MountType {
    pub fn as_str(&self) -> &str {
        match self {
            MountType::Smb => "smb",
            MountType::Ftp => "ftp",
            MountType::Webdav => "webdav",
            MountType::Other(name) => name,
        }
    }
}

impl From<String> for MountType {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "smb" => MountType::Smb,
            "ftp" => MountType::Ftp,
            "webdav" => MountType::Webdav,
            _ => MountType::Other(value),
        }
    }
}

impl From<MountType> for String {
    fn from(value: MountType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How credentials are presented to the remote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    None,
    Password,
    Anonymous,
}

impl AuthMode {
    pub fn is_none(&self) -> bool {
        matches!(self, AuthMode::None)
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => write!(f, "none"),
            AuthMode::Password => write!(f, "password"),
            AuthMode::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Declaration of one network mount to maintain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountDefinition {
    /// Unique key across the active configuration
    pub name: String,

    #[serde(rename = "type")]
    pub mount_type: MountType,

    /// Remote address, with or without a URI scheme (`host/share`, `ftp://host/path`)
    #[serde(rename = "remote")]
    pub remote_address: String,

    #[serde(rename = "mountPoint")]
    pub local_path: PathBuf,

    /// Extra executor flags, passed through in key order
    #[serde(rename = "parameters", default)]
    pub protocol_parameters: BTreeMap<String, String>,

    #[serde(rename = "authType", default, skip_serializing_if = "AuthMode::is_none")]
    pub auth_mode: AuthMode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(rename = "pass", default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
}

impl MountDefinition {
    pub fn new(
        name: impl Into<String>,
        mount_type: MountType,
        remote_address: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            mount_type,
            remote_address: remote_address.into(),
            local_path: local_path.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.auth_mode = AuthMode::Password;
        self.user = user.into();
        self.secret = secret.into();
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}
