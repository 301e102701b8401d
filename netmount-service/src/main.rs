// SPDX-License-Identifier: GPL-3.0-only

//! NetMount service - keeps configured rclone mounts running

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use netmount_service::cli::Args;
use netmount_service::{
    ConfigStore, LogSink, MountService, Supervisor, SupervisorSettings, logging, startup,
};
use netmount_sys::RCloneCli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let sink = Arc::new(LogSink::new(args.log_capacity));
    logging::init(sink.clone(), args.log_dir.as_deref())?;

    tracing::info!("Starting NetMount service v{}", env!("CARGO_PKG_VERSION"));

    let store = ConfigStore::load(&args.config).context("Fatal: cannot load mount configuration")?;
    tracing::info!("Using config {:?}", store.path());

    let rclone = RCloneCli::locate(args.rclone_candidate().as_deref())
        .context("Fatal: rclone binary not available")?;

    let supervisor = Supervisor::new(
        Arc::new(store),
        Arc::new(rclone),
        SupervisorSettings::default(),
    );

    if let Err(e) = supervisor.sections().ensure_exists() {
        tracing::warn!("Could not create rclone config: {}", e);
    }

    let service = MountService::new(supervisor.clone(), sink);

    let autostart = {
        let supervisor = supervisor.clone();
        let delay = args.startup_delay();
        tokio::spawn(async move { startup::autostart(&supervisor, delay).await })
    };

    tracing::info!(
        "Service ready, {} mount(s) configured",
        service.supervisor().config().get().mounts.len()
    );

    // Keep service running until shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    autostart.abort();

    tracing::info!("NetMount service shutting down");
    Ok(())
}
