//! # kvprobe
//!
//! A small HTTP service that tells you which server answered, where it is
//! deployed, what its environment looks like, and whether it can reach its
//! key-value store: every `GET /:key` connects to the store, writes a fixed
//! value under `key`, reads it back and disconnects, then renders the steps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use clap::Parser;
//! use kvprobe::app::{self, AppState};
//! use kvprobe::cache::RedisStore;
//! use kvprobe::config::{Config, EnvSnapshot, Identity};
//! use kvprobe::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::parse();
//!     let identity = Identity::detect(config.location.as_deref());
//!     let state = Arc::new(AppState::new(config, identity, EnvSnapshot::capture(), RedisStore::new())?);
//!
//!     let pipeline = Arc::new(app::pipeline(Arc::clone(&state)));
//!     let server = Server::bind(state.config.listen_addr()).await?;
//!     server.run(move |req| {
//!         let pipeline = Arc::clone(&pipeline);
//!         async move { pipeline.handle(req).await }
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod middleware;
pub mod page;
pub mod router;
pub mod server;

pub use cache::{CacheError, KvConnection, KvStore, RoundTripError, Trace, perform_round_trip};
pub use config::{Config, StoreConfig};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
