//! End-to-end: a real server on an ephemeral port, driven over raw TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use kvprobe::app::{self, AppState};
use kvprobe::cache::{Fault, KvStore, MemoryStore, RedisStore};
use kvprobe::config::{Config, EnvSnapshot, Identity};
use kvprobe::server::{Server, ServerError};

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
    }
}

async fn start<S: KvStore + 'static>(store: S, extra_args: &[&str]) -> Running {
    let args = ["kvprobe", "--default-key", "my-key"]
        .into_iter()
        .chain(extra_args.iter().copied());
    let config = Config::try_parse_from(args).unwrap();
    let env: EnvSnapshot = [("PROBE_ENV".to_owned(), "integration".to_owned())]
        .into_iter()
        .collect();
    let state = Arc::new(AppState::new(
        config,
        Identity::new("test-host", Some("/org/demo/location/azure-eastus2")),
        env,
        store,
    ).unwrap());
    let pipeline = Arc::new(app::pipeline(state));

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run_until(
        move |req| {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.handle(req).await }
        },
        async move {
            let _ = stopped.await;
        },
    ));

    Running { addr, stop, task }
}

/// Sends one `Connection: close` request and returns the raw response.
async fn fetch(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn round_trip_page_over_tcp() {
    let store = MemoryStore::new();
    let server = start(store.clone(), &[]).await;

    let response = fetch(server.addr, "/my-key").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.contains("&nbsp;&nbsp;connect redis://127.0.0.1:6379/<br/>"));
    assert!(response.contains("set &quot;my-key&quot;"));
    assert!(response.contains("get &quot;my-key&quot; returned &quot;this is my-key&#39;s stored value&quot;"));
    assert!(response.contains("&nbsp;&nbsp;disconnect<br/>"));
    assert!(response.contains("<li>PROBE_ENV = integration</li>"));
    assert!(response.contains("color: green; font-weight: bold\">azure-eastus2"));

    assert_eq!(store.open_connections(), 0);
    server.shutdown().await;
}

#[tokio::test]
async fn keep_alive_serves_several_requests_on_one_connection() {
    let store = MemoryStore::new();
    let server = start(store.clone(), &[]).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    let first = String::from_utf8(head).unwrap();
    assert!(first.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(first.contains("Connection: keep-alive\r\n"));

    stream
        .write_all(b"GET /second HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(String::from_utf8_lossy(&rest).starts_with("HTTP/1.1 200 OK\r\n"));

    assert_eq!(store.total_connections(), 1);
    assert_eq!(store.value("second").as_deref(), Some("this is my-key's stored value"));
    server.shutdown().await;
}

#[tokio::test]
async fn store_failures_do_not_take_the_server_down() {
    let store = MemoryStore::new().with_fault(Fault::RejectWrites);
    let server = start(store.clone(), &[]).await;

    for _ in 0..3 {
        let response = fetch(server.addr, "/my-key").await;
        assert!(response.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
        assert!(response.contains("Exception:<br/>round trip failed while writing"));
    }
    assert_eq!(store.open_connections(), 0);

    store.set_fault(None);
    let response = fetch(server.addr, "/my-key").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    server.shutdown().await;
}

#[tokio::test]
async fn unreachable_redis_is_reported_as_503() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = closed.local_addr().unwrap().port().to_string();
    drop(closed);

    let server = start(
        RedisStore::new(),
        &["--redis-host", "127.0.0.1", "--redis-port", port.as_str()],
    )
    .await;

    let response = fetch(server.addr, "/my-key").await;
    assert!(response.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(response.contains("round trip failed while connecting"));
    assert!(!response.contains("set &quot;"));

    let index = fetch(server.addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200 OK\r\n"));
    server.shutdown().await;
}

#[tokio::test]
async fn malformed_request_gets_400() {
    let server = start(MemoryStore::new(), &[]).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"\x01\x02 garbage\r\n\r\n").await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    assert!(String::from_utf8_lossy(&raw).starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.shutdown().await;
}
