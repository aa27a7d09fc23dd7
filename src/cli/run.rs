use crate::channel::{DeliveryChannel, HttpSender};
use crate::config::parse::load_config;
use crate::ingest::{start_server, IngestState};
use crate::spool::Spool;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("spool error: {0}")]
    Spool(#[from] crate::spool::SpoolError),

    #[error("collector client error: {0}")]
    Sender(#[from] crate::channel::SendError),

    #[error("invalid listen address '{0}'")]
    ListenAddress(String),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Prints where we looked for a config and exits when none was found.
pub(crate) fn require_config_path(config_path: Option<PathBuf>) -> PathBuf {
    match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/telemetry-spool/config.yml");
            eprintln!("  /etc/telemetry-spool/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'telemetry-spool config init' to generate one.");
            std::process::exit(1);
        }
    }
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path);
    run_forwarder(&config_path).await.map_err(|e| e.into())
}

async fn run_forwarder(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let listen_addr: SocketAddr = config
        .ingest
        .listen
        .parse()
        .map_err(|_| RunError::ListenAddress(config.ingest.listen.clone()))?;

    info!(
        path = %config.spool.path.display(),
        capacity = config.spool.capacity,
        "Opening spool"
    );
    let spool = Arc::new(Spool::open(&config.spool)?);
    info!(backlog = spool.len(), "Spool ready");

    let sender = HttpSender::new(&config.collector)?;
    info!(url = %sender.url(), "Forwarding to collector");

    let channel = Arc::new(DeliveryChannel::new(
        Arc::new(sender),
        Arc::clone(&spool),
        config.drain.clone(),
    ));

    let shutdown = CancellationToken::new();

    let sweeper = spool.sweeper();
    info!(
        interval_secs = sweeper.interval().as_secs(),
        retention_secs = sweeper.retention().as_secs(),
        "Starting spool sweeper"
    );
    let sweeper_handle = sweeper.spawn(shutdown.clone());

    let drain_handle = Arc::clone(&channel).spawn_drain_loop(shutdown.clone());

    let state = Arc::new(IngestState {
        channel,
        version: env!("CARGO_PKG_VERSION").to_string(),
        start_time: std::time::Instant::now(),
    });
    let server_shutdown = shutdown.clone();
    let mut server_handle =
        tokio::spawn(async move { start_server(listen_addr, state, server_shutdown).await });

    let finished = tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            None
        }
        result = &mut server_handle => Some(result),
    };

    shutdown.cancel();
    let server_result = match finished {
        Some(result) => result,
        None => server_handle.await,
    };

    drain_handle.await?;
    sweeper_handle.await?;

    match server_result {
        Ok(Ok(())) => {
            info!(backlog = spool.len(), "Forwarder stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(RunError::Server(e)),
        Err(e) => Err(RunError::Join(e)),
    }
}
