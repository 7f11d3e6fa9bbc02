//! Key-value store access and the connectivity round trip.
//!
//! The round trip ([`perform_round_trip`]) opens a fresh connection, writes
//! the configured value under a key, reads it back and closes the
//! connection, recording every step in a [`Trace`].
//!
//! Stores plug in through two traits:
//!
//! - [`KvStore`] opens connections from [`ConnectionParameters`].
//! - [`KvConnection`] is one open connection: `set`, `get`, `disconnect`.
//!
//! [`RedisStore`] talks to a real server; [`MemoryStore`] keeps entries in
//! process and can inject faults.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;

pub mod memory;
pub mod redis_store;
pub mod roundtrip;
pub mod trace;

pub use memory::{Fault, MemoryConnection, MemoryStore};
pub use redis_store::{RedisConnection, RedisStore};
pub use roundtrip::{RoundTripError, Stage, perform_round_trip};
pub use trace::{ReadBack, Trace, TraceStep};

/// Host used when no store host is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when no store port is configured.
pub const DEFAULT_PORT: u16 = 6379;

/// Errors reported by a [`KvStore`] or one of its connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The store is unreachable, refused the connection, or the connection
    /// dropped before a command completed.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The connection is fine but the store rejected or garbled a command.
    #[error("{command} rejected by store: {reason}")]
    Operation {
        command: &'static str,
        reason: String,
    },
}

impl CacheError {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Where to reach the store for one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
}

impl ConnectionParameters {
    /// Applies the configured overrides, falling back to the local default
    /// endpoint for whatever is unset.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            host: config
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: config.port.unwrap_or(DEFAULT_PORT),
        }
    }

    /// The endpoint as a `redis://` URL.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A key-value store that can open connections.
#[async_trait]
pub trait KvStore: Send + Sync {
    type Connection: KvConnection;

    /// Opens a new connection. Never reuses an earlier one.
    async fn connect(&self, params: &ConnectionParameters)
    -> Result<Self::Connection, CacheError>;
}

/// One open connection to a [`KvStore`].
#[async_trait]
pub trait KvConnection: Send {
    /// Stores `value` under `key`, unconditionally overwriting.
    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Reads the value under `key`; `None` if the key does not exist.
    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError>;

    /// Closes the connection. Commands after this fail.
    async fn disconnect(&mut self) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_default_to_local_endpoint() {
        let params = ConnectionParameters::from_config(&StoreConfig::default());
        assert_eq!(params.host, "127.0.0.1");
        assert_eq!(params.port, 6379);
        assert_eq!(params.url(), "redis://127.0.0.1:6379/");
        assert_eq!(params, ConnectionParameters::default());
    }

    #[test]
    fn parameters_apply_partial_overrides() {
        let host_only = StoreConfig {
            host: Some("cache.internal".into()),
            port: None,
        };
        assert_eq!(
            ConnectionParameters::from_config(&host_only).to_string(),
            "cache.internal:6379"
        );

        let port_only = StoreConfig {
            host: None,
            port: Some(6380),
        };
        assert_eq!(
            ConnectionParameters::from_config(&port_only).url(),
            "redis://127.0.0.1:6380/"
        );
    }

    #[test]
    fn error_kinds() {
        let conn = CacheError::Connection {
            endpoint: "127.0.0.1:1".into(),
            reason: "refused".into(),
        };
        assert!(conn.is_connection());
        assert_eq!(conn.to_string(), "connection to 127.0.0.1:1 failed: refused");

        let op = CacheError::Operation {
            command: "SET",
            reason: "READONLY".into(),
        };
        assert!(!op.is_connection());
        assert_eq!(op.to_string(), "SET rejected by store: READONLY");
    }
}
