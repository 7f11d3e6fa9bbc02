//! Process configuration, read once at startup.
//!
//! Every option is both a command-line flag and an environment variable, so
//! the probe runs unchanged on a platform that injects `PORT`,
//! `CPLN_LOCATION` and friends. Nothing below `main` reads the environment;
//! handlers and the round trip receive these structs explicitly.

use clap::{Args, Parser};
use thiserror::Error;

pub mod environment;

pub use environment::{EnvSnapshot, Identity};

/// Configuration rejected by [`Config::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the default cache key must not be empty")]
    EmptyDefaultKey,

    #[error("redis port must be between 1 and 65535")]
    InvalidStorePort,
}

/// Top-level configuration of the probe.
#[derive(Debug, Clone, Parser)]
#[command(name = "kvprobe", version, about = "Location-aware key-value store connectivity probe")]
pub struct Config {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 8081)]
    pub port: u16,

    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// Deployment location; only the segment after the last `/` is shown
    #[arg(long, env = "CPLN_LOCATION")]
    pub location: Option<String>,

    #[command(flatten)]
    pub store: StoreConfig,

    /// Key used when a request does not name one
    #[arg(long, env = "TEST_KEY", default_value = "my-key")]
    pub default_key: String,

    /// Value written on every round trip, whatever the key
    #[arg(
        long,
        env = "TEST_KEY_VALUE",
        default_value = "this is my-key's stored value"
    )]
    pub stored_value: String,
}

/// Optional overrides for the key-value store endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct StoreConfig {
    /// Store host; the local default endpoint is used when unset
    #[arg(id = "redis_host", long = "redis-host", env = "REDIS_HOST")]
    pub host: Option<String>,

    /// Store port; 6379 when unset
    #[arg(id = "redis_port", long = "redis-port", env = "REDIS_PORT")]
    pub port: Option<u16>,
}

impl Config {
    /// Checks the values clap cannot express as types.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyDefaultKey`] for a blank `TEST_KEY`,
    /// [`ConfigError::InvalidStorePort`] for `REDIS_PORT=0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_key.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultKey);
        }
        if self.store.port == Some(0) {
            return Err(ConfigError::InvalidStorePort);
        }
        Ok(())
    }

    /// `bind:port`, ready for [`Server::bind`](crate::server::Server::bind).
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// The request key, or the configured default when the request has none.
    pub fn key_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(&self.default_key)
    }
}
