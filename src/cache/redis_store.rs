//! [`KvStore`] backed by a Redis server.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use super::{CacheError, ConnectionParameters, KvConnection, KvStore};

/// Opens one Redis connection per round trip; nothing is pooled.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisStore;

impl RedisStore {
    pub fn new() -> Self {
        Self
    }
}

/// One live connection to a Redis server.
pub struct RedisConnection {
    inner: redis::aio::Connection,
    endpoint: String,
}

/// Sorts a client error into the two kinds the round trip reports.
fn classify(endpoint: &str, command: &'static str, err: redis::RedisError) -> CacheError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        CacheError::Connection {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        }
    } else {
        CacheError::Operation {
            command,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    type Connection = RedisConnection;

    async fn connect(&self, params: &ConnectionParameters) -> Result<RedisConnection, CacheError> {
        let endpoint = params.to_string();
        let connection_error = |err: redis::RedisError| CacheError::Connection {
            endpoint: endpoint.clone(),
            reason: err.to_string(),
        };

        let client = redis::Client::open(params.url().as_str()).map_err(connection_error)?;
        let inner = client
            .get_async_connection()
            .await
            .map_err(connection_error)?;

        debug!(endpoint = %endpoint, "redis connection established");
        Ok(RedisConnection { inner, endpoint })
    }
}

#[async_trait]
impl KvConnection for RedisConnection {
    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner
            .set::<_, _, ()>(key, value)
            .await
            .map_err(|e| classify(&self.endpoint, "SET", e))
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| classify(&self.endpoint, "GET", e))
    }

    async fn disconnect(&mut self) -> Result<(), CacheError> {
        redis::cmd("QUIT")
            .query_async::<_, ()>(&mut self.inner)
            .await
            .map_err(|e| classify(&self.endpoint, "QUIT", e))
    }
}
