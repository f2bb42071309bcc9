use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lhls_engine::Playlist;
use lhls_faker::{
    cli::Args,
    config::ServerConfig,
    logging,
    server::{AppState, LhlsServer},
};
use mimalloc::MiMalloc;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from(Args::parse());

    // Keep the file writer alive until exit so buffered lines are flushed.
    let _log_guard = logging::init_logging(config.verbose, config.log_dir.as_deref())?;

    let playlist = Playlist::load(&config.playlist)
        .await
        .with_context(|| format!("Failed to load playlist {}", config.playlist.display()))?;

    info!(
        segment_dir = %playlist.base_dir().display(),
        segments = playlist.segments().len(),
        total_duration = playlist.total_duration(),
        target_duration = playlist.target_duration(),
        "Loaded playlist"
    );

    let addr = config.socket_addr()?;
    let state = AppState::new(Arc::new(playlist), config.live.clone());
    let server = LhlsServer::new(addr, state);

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                cancel_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    server.run().await?;
    Ok(())
}
