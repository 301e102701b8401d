// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config_store::DEFAULT_CONFIG_PATH;
use crate::log_sink::DEFAULT_LOG_CAPACITY;

/// Supervisor daemon for rclone-backed network mounts
#[derive(Debug, Clone, Parser)]
#[command(name = "netmount-service", version, about)]
pub struct Args {
    /// Persisted mount configuration (JSON)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// rclone binary, defaults to one next to this executable, then PATH
    #[arg(long)]
    pub rclone: Option<PathBuf>,

    /// Seconds to wait before auto-mounting at startup
    #[arg(long, default_value_t = 2)]
    pub startup_delay_secs: u64,

    /// Number of log lines kept in memory
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Also write a daily rolling log file into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Explicit `--rclone`, else `rclone` beside the running executable
    pub fn rclone_candidate(&self) -> Option<PathBuf> {
        self.rclone.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("rclone")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["netmount-service"]);
        assert_eq!(args.config, PathBuf::from("/data/adb/netmount/config.json"));
        assert_eq!(args.startup_delay(), Duration::from_secs(2));
        assert_eq!(args.log_capacity, 500);
        assert!(args.log_dir.is_none());
        assert!(args.rclone_candidate().is_some_and(|p| p.ends_with("rclone")));
    }

    #[test]
    fn explicit_rclone_wins() {
        let args = Args::parse_from([
            "netmount-service",
            "--rclone",
            "/opt/rclone",
            "--startup-delay-secs",
            "0",
        ]);
        assert_eq!(args.rclone_candidate(), Some(PathBuf::from("/opt/rclone")));
        assert!(args.startup_delay().is_zero());
    }
}
