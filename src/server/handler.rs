// src/server/handler.rs
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Seam between the accept loop and whatever consumes connections.
///
/// The stream and its peer address transfer to the handler, which owns the
/// connection from then on; the server never revisits it.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()>;
}
