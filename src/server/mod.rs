//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and hands each HTTP/1.1 request to a handler
//! function. Connections are persistent unless the client asks otherwise;
//! every connection runs on its own task, so a slow round trip only holds up
//! the client that asked for it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Largest request we buffer before answering 413 (64 KiB; the probe only
/// serves `GET`).
const MAX_REQUEST_SIZE: usize = 64 * 1024;

const INITIAL_BUF_SIZE: usize = 4096;

/// The probe's HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use kvprobe::server::Server;
/// use kvprobe::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8081").await?;
///     server.run(|_req: Request| async {
///         Response::new(StatusCode::Ok).body("up")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until the process is terminated.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// Once `shutdown` completes no new connections are accepted; connections
    /// already being served finish on their own tasks.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        tokio::pin!(shutdown);
        info!(address = %self.local_addr, "kvprobe listening");

        loop {
            let (stream, peer_addr) = tokio::select! {
                () = &mut shutdown => {
                    info!(address = %self.local_addr, "shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Serves one TCP connection, one request per loop iteration, until the
/// peer closes it or asks for `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        // Pipelined requests may already be buffered.
        let parsed = if buf.is_empty() {
            Err(RequestError::Incomplete)
        } else {
            Request::parse(&buf)
        };

        let (request, body_offset) = match parsed {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if buf.len() > MAX_REQUEST_SIZE {
                    warn!(peer = %peer_addr, "request too large, sending 413");
                    let response = Response::new(StatusCode::PayloadTooLarge)
                        .body("Request entity too large")
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    break;
                }
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        let total_needed = body_offset + request.content_length().unwrap_or(0);
        if total_needed > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "declared body too large, sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }
        if buf.len() < total_needed {
            if stream.read_buf(&mut buf).await? == 0 {
                debug!(peer = %peer_addr, "connection closed mid-body");
                break;
            }
            continue;
        }

        let keep_alive = request.is_keep_alive();
        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = handler(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}
