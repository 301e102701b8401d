// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One line of the in-memory service log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level: level.into(),
            message: message.into(),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS - message`
    pub fn render(&self) -> String {
        format!("{} - {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"), self.message)
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
