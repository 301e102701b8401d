// SPDX-License-Identifier: GPL-3.0-only

//! Severity sniffing for executor output lines

/// Which pipe a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Severity inferred from the keywords rclone prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeverity {
    Error,
    Warning,
    Notice,
    Info,
    /// Untagged stdout line
    Plain,
    /// Untagged stderr line
    Debug,
}

impl LineSeverity {
    pub fn tag(&self) -> &'static str {
        match self {
            LineSeverity::Error => "error",
            LineSeverity::Warning => "warning",
            LineSeverity::Notice => "notice",
            LineSeverity::Info => "info",
            LineSeverity::Plain => "output",
            LineSeverity::Debug => "debug",
        }
    }
}

pub fn classify_line(kind: StreamKind, line: &str) -> LineSeverity {
    match kind {
        StreamKind::Stdout => {
            if line.contains("INFO") {
                LineSeverity::Info
            } else if line.contains("NOTICE") {
                LineSeverity::Notice
            } else {
                LineSeverity::Plain
            }
        }
        StreamKind::Stderr => {
            if line.contains("CRITICAL") || line.contains("ERROR") {
                LineSeverity::Error
            } else if line.contains("WARNING") {
                LineSeverity::Warning
            } else if line.contains("INFO") {
                LineSeverity::Info
            } else {
                LineSeverity::Debug
            }
        }
    }
}
