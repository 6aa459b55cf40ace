use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::errors::{ConnectionError, QueryError};
use crate::state::record::TextRecord;

/// Query surface of one live connection to the document store.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Look up the unique record for `key`.
    async fn find(&self, key: &str) -> Result<Option<TextRecord>, QueryError>;

    /// Atomically insert or fully replace the text stored under `key`.
    async fn upsert(
        &self,
        key: &str,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<TextRecord, QueryError>;
}

/// Opens sessions against a document store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake and hand back a usable session.
    async fn connect(&self) -> Result<Session, ConnectionError>;

    /// Human-readable target for logs. Must not contain credentials.
    fn describe(&self) -> String;
}

/// An established connection.
///
/// `disconnected` yields once the connection is lost. A closed channel
/// counts as lost too.
pub struct Session {
    pub backend: Arc<dyn TextBackend>,
    pub disconnected: mpsc::UnboundedReceiver<String>,
}
