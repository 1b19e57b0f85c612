//! Bubble FTP Server - Entry Point

use anyhow::Context;
use log::{error, info};
use std::sync::Arc;

use bubble_ftp_server::auth::StaticCredentials;
use bubble_ftp_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load().context("failed to load configuration")?;
    info!("Launching FTP server on {}", config.control_socket());

    let credentials = Arc::new(StaticCredentials::from_config(&config));
    let server = Server::bind(config, credentials)
        .await
        .context("failed to start server")?;

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown.cancel();
    });

    server.run().await;
    info!("Server shut down");
    Ok(())
}
