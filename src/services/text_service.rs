use std::sync::Arc;

use chrono::Utc;

use crate::errors::QueryError;
use crate::persistence::Gateway;
use crate::state::record::{TextLookup, TextRecord};

/// Reads and writes text records through the gateway's current connection.
///
/// Concurrent writers to one key are not coordinated here: the store's
/// per-document atomic upsert decides the order and the last write wins.
#[derive(Clone)]
pub struct TextStore {
    gateway: Arc<Gateway>,
}

impl TextStore {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Look up `key`. Never creates a record.
    pub async fn get(&self, key: &str) -> Result<TextLookup, QueryError> {
        let found = self
            .gateway
            .execute(|db| async move { db.find(key).await })
            .await?;
        Ok(TextLookup::from(found))
    }

    /// Create or fully replace the text under `key`, stamping `updatedAt`.
    ///
    /// A missing text is stored as the empty string.
    pub async fn upsert(&self, key: &str, text: Option<String>) -> Result<TextRecord, QueryError> {
        let text = text.unwrap_or_default();
        let now = Utc::now();

        let record = self
            .gateway
            .execute(|db| async move { db.upsert(key, &text, now).await })
            .await?;

        tracing::debug!(key, len = record.text.len(), "Text saved");
        Ok(record)
    }
}
