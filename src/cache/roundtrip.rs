//! The connectivity round trip: connect, write, read back, disconnect.

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::{CacheError, ConnectionParameters, KvConnection, KvStore, ReadBack, Trace, TraceStep};
use crate::config::StoreConfig;

/// Where a round trip is in its lifecycle.
///
/// ```text
/// Idle -> Connecting -> Writing -> Reading -> Disconnecting -> Done
///   \________\____________\_________\____________\_______-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Connecting,
    Writing,
    Reading,
    Disconnecting,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Connecting),
            Self::Connecting => Some(Self::Writing),
            Self::Writing => Some(Self::Reading),
            Self::Reading => Some(Self::Disconnecting),
            Self::Disconnecting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || self.successor() == Some(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Writing => "writing",
            Self::Reading => "reading",
            Self::Disconnecting => "disconnecting",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// A failed round trip: the store error, the stage it hit, and the steps
/// attempted up to that point.
#[derive(Debug, Error)]
#[error("round trip failed while {failed_at}: {source}")]
pub struct RoundTripError {
    failed_at: Stage,
    source: CacheError,
    trace: Trace,
}

impl RoundTripError {
    pub fn failed_at(&self) -> Stage {
        self.failed_at
    }

    pub fn error(&self) -> &CacheError {
        &self.source
    }

    /// Steps attempted before and during the failure, including the
    /// cleanup `disconnect` when one was issued.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn is_connection(&self) -> bool {
        self.source.is_connection()
    }
}

struct Run<'a> {
    key: &'a str,
    stage: Stage,
    trace: Trace,
}

impl<'a> Run<'a> {
    fn new(key: &'a str) -> Self {
        Self {
            key,
            stage: Stage::Idle,
            trace: Trace::new(),
        }
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal round trip transition {} -> {}",
            self.stage,
            next
        );
        debug!(key = self.key, from = %self.stage, to = %next, "round trip stage");
        self.stage = next;
    }

    fn fail(mut self, source: CacheError) -> RoundTripError {
        let failed_at = self.stage;
        self.enter(Stage::Failed);
        error!(key = self.key, stage = %failed_at, error = %source, "cache round trip failed");
        RoundTripError {
            failed_at,
            source,
            trace: self.trace,
        }
    }

    /// Fails the run after a successful connect, closing the connection first.
    async fn abort<C: KvConnection>(mut self, conn: &mut C, source: CacheError) -> RoundTripError {
        self.trace.push(TraceStep::Disconnect);
        if let Err(close) = conn.disconnect().await {
            warn!(key = self.key, error = %close, "closing connection after failure also failed");
        }
        self.fail(source)
    }
}

/// Writes `value` under `key` on a fresh connection, reads it back and
/// disconnects.
///
/// The connection is opened and closed within this call. Nothing is retried.
/// When `set` or `get` fail the connection is still closed before the error
/// is returned.
///
/// # Errors
///
/// Returns a [`RoundTripError`] wrapping [`CacheError::Connection`] when the
/// store cannot be reached or the connection drops, and
/// [`CacheError::Operation`] when the store rejects a command.
///
/// # Examples
///
/// ```
/// use kvprobe::cache::{MemoryStore, perform_round_trip};
/// use kvprobe::config::StoreConfig;
///
/// # #[tokio::main] async fn main() {
/// let store = MemoryStore::new();
/// let trace = perform_round_trip(&store, &StoreConfig::default(), "my-key", "hello")
///     .await
///     .unwrap();
/// assert_eq!(trace.read_back(), Some("hello"));
/// # }
/// ```
pub async fn perform_round_trip<S: KvStore>(
    store: &S,
    config: &StoreConfig,
    key: &str,
    value: &str,
) -> Result<Trace, RoundTripError> {
    let params = ConnectionParameters::from_config(config);
    let mut run = Run::new(key);

    run.enter(Stage::Connecting);
    run.trace.push(TraceStep::Connect {
        endpoint: params.url(),
    });
    let mut conn = match store.connect(&params).await {
        Ok(conn) => conn,
        Err(err) => return Err(run.fail(err)),
    };

    run.enter(Stage::Writing);
    run.trace.push(TraceStep::Set {
        key: key.to_owned(),
        value: value.to_owned(),
    });
    if let Err(err) = conn.set(key, value).await {
        return Err(run.abort(&mut conn, err).await);
    }

    run.enter(Stage::Reading);
    run.trace.push(TraceStep::Get {
        key: key.to_owned(),
        read: ReadBack::Pending,
    });
    match conn.get(key).await {
        Ok(read) => run.trace.record_read(read),
        Err(err) => return Err(run.abort(&mut conn, err).await),
    }

    run.enter(Stage::Disconnecting);
    run.trace.push(TraceStep::Disconnect);
    if let Err(err) = conn.disconnect().await {
        return Err(run.fail(err));
    }

    run.enter(Stage::Done);
    debug!(key, endpoint = %params, "cache round trip complete");
    Ok(run.trace)
}
