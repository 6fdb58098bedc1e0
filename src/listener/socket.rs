// ────────────────────────────────
// src/listener/socket.rs
// Low‑level create/configure/bind/listen, staged so each failure keeps
// its own error variant.
// ────────────────────────────────
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use super::ListenError;

/// Build a stream socket listening on all local interfaces.
///
/// A socket that fails to bind or listen is dropped on the error path, so
/// callers never receive a half-configured handle.
pub fn listen_socket(port: u16, backlog: i32, reuse_address: bool) -> Result<Socket, ListenError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(ListenError::Create)?;

    if reuse_address {
        // Lets a quickly restarted process rebind the port while the previous
        // socket is still lingering in teardown.
        socket.set_reuse_address(true).map_err(ListenError::Create)?;
    }

    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket
        .bind(&addr.into())
        .map_err(|source| ListenError::Bind { port, source })?;

    socket
        .listen(backlog)
        .map_err(|source| ListenError::Listen { port, source })?;

    Ok(socket)
}
