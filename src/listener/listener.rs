// ────────────────────────────────
// src/listener/listener.rs
// One listening socket, one connection at a time.
// ────────────────────────────────
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

use socket2::Socket;

use super::socket::listen_socket;
use crate::config::ListenerConfig;

/// Default pending-connection queue: a single not-yet-accepted peer.
pub const DEFAULT_BACKLOG: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("Failed to create socket: {0}")]
    Create(#[source] io::Error),

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to listen on port {port}: {source}")]
    Listen {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("Listener has not been started")]
    NotStarted,

    #[error("Listener is already started")]
    AlreadyStarted,

    #[error("Listener handle operation failed: {0}")]
    Handle(#[source] io::Error),
}

/// Owns at most one listening socket.
///
/// Constructed unset; [`start`](Listener::start) binds and listens; the
/// socket is released exactly once, on [`close`](Listener::close) or on drop,
/// whichever comes first. Accepted connections are handed to the caller and
/// never tracked here. Instances are not synchronized: keep one outstanding
/// `accept` per listener and serialize access across threads yourself.
pub struct Listener {
    socket: Option<Socket>,
}

impl Listener {
    pub fn new() -> Self {
        Self { socket: None }
    }

    /// Bind `port` on all local interfaces and start listening with the
    /// stock settings (backlog 1, address reuse on).
    ///
    /// Returns the raw descriptor so the caller can register it with an
    /// external readiness mechanism before blocking on
    /// [`accept`](Listener::accept).
    pub fn start(&mut self, port: u16) -> Result<RawFd, ListenError> {
        self.start_with(&ListenerConfig::for_port(port))
    }

    /// [`start`](Listener::start) with backlog and reuse taken from `config`.
    pub fn start_with(&mut self, config: &ListenerConfig) -> Result<RawFd, ListenError> {
        if self.socket.is_some() {
            return Err(ListenError::AlreadyStarted);
        }

        let socket = listen_socket(config.port, config.backlog, config.reuse_address)?;
        let fd = socket.as_raw_fd();
        self.socket = Some(socket);

        tracing::debug!(port = config.port, backlog = config.backlog, fd, "listener started");
        Ok(fd)
    }

    /// Block until the next peer connects and return the connection.
    ///
    /// The peer address is discarded; call `TcpStream::peer_addr` on the
    /// returned stream if it is needed. Fails immediately when the listener
    /// was never started.
    pub fn accept(&self) -> Result<TcpStream, ListenError> {
        let socket = self.socket.as_ref().ok_or(ListenError::NotStarted)?;
        let (conn, _peer) = socket.accept().map_err(ListenError::Accept)?;
        Ok(conn.into())
    }

    /// Address the socket is bound to. Reports the OS-assigned port after
    /// binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ListenError> {
        let socket = self.socket.as_ref().ok_or(ListenError::NotStarted)?;
        let addr = socket.local_addr().map_err(ListenError::Handle)?;
        addr.as_socket().ok_or_else(|| {
            ListenError::Handle(io::Error::new(io::ErrorKind::Other, "non-IP local address"))
        })
    }

    /// Raw descriptor of the listening socket, for poller registration.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(|s| s.as_raw_fd())
    }

    pub fn is_listening(&self) -> bool {
        self.socket.is_some()
    }

    /// Release the socket now. Safe to call repeatedly; drop releases it
    /// otherwise.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            drop(socket);
            tracing::debug!("listener closed");
        }
    }

    /// Handle a collaborator can use to abort a blocked
    /// [`accept`](Listener::accept) from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle, ListenError> {
        let socket = self.socket.as_ref().ok_or(ListenError::NotStarted)?;
        let dup = socket.try_clone().map_err(ListenError::Handle)?;
        Ok(ShutdownHandle { socket: dup })
    }

    /// Hand the socket to the tokio runtime for readiness-driven accepts.
    ///
    /// Must be called from within a runtime. The listener gives up ownership;
    /// the returned listener releases the socket when dropped.
    pub fn into_tokio(mut self) -> Result<tokio::net::TcpListener, ListenError> {
        let socket = self.socket.take().ok_or(ListenError::NotStarted)?;
        socket.set_nonblocking(true).map_err(ListenError::Handle)?;
        let std_listener: std::net::TcpListener = socket.into();
        tokio::net::TcpListener::from_std(std_listener).map_err(ListenError::Handle)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

/// Duplicated listening handle whose only purpose is to unblock a pending
/// `accept` on the originating [`Listener`].
pub struct ShutdownHandle {
    socket: Socket,
}

impl ShutdownHandle {
    /// Force a blocked `accept` on the original listener to fail. The
    /// duplicated descriptor itself is released when this handle drops.
    pub fn shutdown(&self) {
        if let Err(err) = self.socket.shutdown(Shutdown::Both) {
            tracing::debug!(%err, "listener shutdown");
        }
    }
}
