//! In-process [`KvStore`] with fault injection.
//!
//! Stands in for a real server in tests and local runs: entries live in a
//! shared map, connections are counted, and a [`Fault`] can make the store
//! misbehave in the ways a real one does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{CacheError, ConnectionParameters, KvConnection, KvStore};

/// A way for [`MemoryStore`] to misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `connect` fails as if nothing listens on the endpoint.
    RefuseConnections,
    /// `set` is rejected at the protocol level.
    RejectWrites,
    /// The connection drops while `get` is in flight.
    DropOnRead,
}

#[derive(Default)]
struct Shared {
    entries: Mutex<HashMap<String, String>>,
    fault: Mutex<Option<Fault>>,
    opened: AtomicUsize,
    open: AtomicUsize,
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fault(&self) -> Option<Fault> {
        *self
            .fault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle to an in-memory store. Clones share the same entries.
///
/// # Examples
///
/// ```
/// use kvprobe::cache::{Fault, MemoryStore};
///
/// let store = MemoryStore::new().with_fault(Fault::RejectWrites);
/// assert_eq!(store.open_connections(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fault(self, fault: Fault) -> Self {
        self.set_fault(Some(fault));
        self
    }

    /// Installs or clears the active fault for subsequent commands.
    pub fn set_fault(&self, fault: Option<Fault>) {
        *self
            .shared
            .fault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fault;
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.shared.entries().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connections opened and not yet disconnected.
    pub fn open_connections(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Connections opened over the store's lifetime.
    pub fn total_connections(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }
}

/// A connection handed out by [`MemoryStore`].
pub struct MemoryConnection {
    shared: Arc<Shared>,
    endpoint: String,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed {
            return Err(CacheError::Connection {
                endpoint: self.endpoint.clone(),
                reason: "connection already closed".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    type Connection = MemoryConnection;

    async fn connect(&self, params: &ConnectionParameters) -> Result<MemoryConnection, CacheError> {
        if self.shared.fault() == Some(Fault::RefuseConnections) {
            return Err(CacheError::Connection {
                endpoint: params.to_string(),
                reason: "connection refused".into(),
            });
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.open.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            endpoint: params.to_string(),
            closed: false,
        })
    }
}

#[async_trait]
impl KvConnection for MemoryConnection {
    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        self.ensure_open()?;
        if self.shared.fault() == Some(Fault::RejectWrites) {
            return Err(CacheError::Operation {
                command: "SET",
                reason: "READONLY You can't write against a read only replica.".into(),
            });
        }
        self.shared.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        self.ensure_open()?;
        if self.shared.fault() == Some(Fault::DropOnRead) {
            return Err(CacheError::Connection {
                endpoint: self.endpoint.clone(),
                reason: "connection reset by peer".into(),
            });
        }
        Ok(self.shared.entries().get(key).cloned())
    }

    async fn disconnect(&mut self) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.closed = true;
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
