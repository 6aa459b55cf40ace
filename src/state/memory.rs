use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::errors::{ConnectionError, QueryError};
use crate::state::backend::{Connector, Session, TextBackend};
use crate::state::record::TextRecord;

/// Internal HashMap type, one entry per key.
pub type InnerMap = HashMap<String, TextRecord>;

/// Process-local text store.
///
/// The map is shared by every session the owning connector hands out, so
/// data survives a reconnect the way it would on a real server.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<InnerMap>>,
}

fn poisoned() -> QueryError {
    QueryError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl TextBackend for MemoryBackend {
    async fn find(&self, key: &str) -> Result<Option<TextRecord>, QueryError> {
        let map = self.records.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn upsert(
        &self,
        key: &str,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<TextRecord, QueryError> {
        let record = TextRecord {
            key: key.to_string(),
            text: text.to_string(),
            updated_at,
        };

        let mut map = self.records.write().map_err(|_| poisoned())?;
        map.insert(key.to_string(), record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct Controls {
    unreachable: AtomicBool,
    failures_pending: AtomicUsize,
    attempts: AtomicUsize,
    live: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

/// A `Connector` over a `MemoryBackend` whose availability can be steered.
///
/// Used to run the gateway and the HTTP layer without a database server.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    backend: MemoryBackend,
    controls: Arc<Controls>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// While unreachable, every handshake fails.
    pub fn set_reachable(&self, reachable: bool) {
        self.controls.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Fail the next `n` handshakes, then recover.
    pub fn fail_next(&self, n: usize) {
        self.controls.failures_pending.store(n, Ordering::SeqCst);
    }

    /// Number of handshakes attempted so far.
    pub fn attempts(&self) -> usize {
        self.controls.attempts.load(Ordering::SeqCst)
    }

    /// Signal loss of the current session, if there is one.
    pub fn drop_connection(&self, reason: &str) {
        let sender = match self.controls.live.lock() {
            Ok(mut live) => live.take(),
            Err(_) => None,
        };
        if let Some(tx) = sender {
            let _ = tx.send(reason.to_string());
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.backend.records.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Session, ConnectionError> {
        self.controls.attempts.fetch_add(1, Ordering::SeqCst);

        if self.controls.unreachable.load(Ordering::SeqCst) {
            return Err(ConnectionError::Unreachable("memory store is offline".to_string()));
        }

        let scripted_failure = self
            .controls
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(ConnectionError::Unreachable("memory store refused the handshake".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut live) = self.controls.live.lock() {
            *live = Some(tx);
        }

        Ok(Session {
            backend: Arc::new(self.backend.clone()),
            disconnected: rx,
        })
    }

    fn describe(&self) -> String {
        "memory://local".to_string()
    }
}
