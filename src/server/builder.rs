// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use anyhow::Result;
use std::net::SocketAddr;
use tokio::sync::watch;

use crate::config::ListenerConfig;
use crate::listener::Listener;
use crate::server::handler::ConnectionHandler;

/// Builder pattern so `main.rs` can inject its connection handler.
pub struct ServerBuilder<H: ConnectionHandler> {
    config: ListenerConfig,
    handler: Option<H>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<H: ConnectionHandler> ServerBuilder<H> {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            handler: None,
            shutdown: None,
        }
    }

    /// Inject the connection consumer.
    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Optional shutdown signal; without one, `serve` runs until the accept
    /// loop errors.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Consume the builder, boot the listening socket, hand it to the
    /// runtime. Must be called from within the tokio runtime.
    pub fn build(self) -> Result<Server<H>> {
        let handler = self.handler.expect("handler must be set via with_handler()");

        let mut listener = Listener::new();
        listener.start_with(&self.config)?;
        let local_addr = listener.local_addr()?;
        let listener = listener.into_tokio()?;

        tracing::info!(%local_addr, "TCP server listening");

        Ok(Server {
            listener,
            local_addr,
            handler,
            shutdown: self.shutdown,
        })
    }
}

/// Bound server: accepts connections one at a time and feeds them to the
/// handler until the shutdown signal fires.
pub struct Server<H: ConnectionHandler> {
    listener: tokio::net::TcpListener,
    local_addr: SocketAddr,
    handler: H,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<H: ConnectionHandler> Server<H> {
    /// Actual bound address; reports the OS-assigned port when the config
    /// asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(mut self) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    // One connection at a time: the next accept only starts
                    // once the handler is done with this one. The shutdown
                    // signal is observed between connections.
                    if let Err(err) = self.handler.handle(stream, peer).await {
                        tracing::warn!(%peer, %err, "connection handler error");
                    }
                }
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn wait_for_shutdown(rx: &mut Option<watch::Receiver<bool>>) {
    match rx.as_mut() {
        Some(rx) => loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without signalling; keep serving.
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending::<()>().await,
    }
}
