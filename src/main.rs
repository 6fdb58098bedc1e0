// src/main.rs
use anyhow::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

mod config;
mod listener;
mod server;

use crate::{
    config::Config,
    server::{ConnectionHandler, ServerBuilder},
};

/// Default collaborator: drains whatever the peer sends and logs the total.
struct DrainHandler;

#[async_trait]
impl ConnectionHandler for DrainHandler {
    async fn handle(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let mut buf = [0u8; 4096];
        let mut total = 0usize;
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n;
        }
        info!(%peer, total, "connection drained");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tcp_acceptor=debug".parse()?),
        )
        .init();

    // Load configuration; stock settings apply when no file is given
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => Config::default(),
    };

    // Wire Ctrl+C / SIGTERM to the server's shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = ServerBuilder::new(config.listener)
        .with_handler(DrainHandler)
        .with_shutdown(shutdown_rx)
        .build()?;

    info!("Accepting connections on {}", server.local_addr());
    server.serve().await
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
