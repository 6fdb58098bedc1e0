// tests/listener_tests.rs
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tcp_acceptor::config::ListenerConfig;
use tcp_acceptor::listener::{ListenError, Listener};
use tcp_acceptor::server::{ConnectionHandler, ServerBuilder};

#[test]
fn accepted_connection_carries_bytes() {
    let mut listener = Listener::new();
    listener.start(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(b"ping").unwrap();
    });

    let mut conn = listener.accept().unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ping");

    client.join().unwrap();
}

#[test]
fn accepts_are_independent_and_sequential() {
    let mut listener = Listener::new();
    listener.start(0).unwrap();
    let port = listener.local_addr().unwrap().port();

    for i in 0..3u8 {
        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream.write_all(&[i]).unwrap();
        });

        let mut conn = listener.accept().unwrap();
        let mut buf = [0u8; 1];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], i);

        client.join().unwrap();
    }
}

#[test]
fn shutdown_handle_unblocks_pending_accept() {
    let mut listener = Listener::new();
    listener.start(0).unwrap();
    let handle = listener.shutdown_handle().unwrap();

    let acceptor = thread::spawn(move || listener.accept());

    // Let the acceptor block before pulling the rug.
    thread::sleep(Duration::from_millis(100));
    handle.shutdown();

    let result = acceptor.join().unwrap();
    assert!(matches!(result, Err(ListenError::Accept(_))));
}

struct CountingHandler(Arc<AtomicUsize>);

#[async_trait::async_trait]
impl ConnectionHandler for CountingHandler {
    async fn handle(
        &self,
        _stream: tokio::net::TcpStream,
        _peer: std::net::SocketAddr,
    ) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn server_serves_until_shutdown() {
    let served = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let server = ServerBuilder::new(ListenerConfig::for_port(0))
        .with_handler(CountingHandler(served.clone()))
        .with_shutdown(shutdown_rx)
        .build()
        .unwrap();
    let port = server.local_addr().port();

    let task = tokio::spawn(server.serve());

    for _ in 0..2 {
        let _ = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
    }

    // Connections are served one at a time; wait for the loop to drain both.
    for _ in 0..50 {
        if served.load(Ordering::SeqCst) == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(served.load(Ordering::SeqCst), 2);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}
