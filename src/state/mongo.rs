use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime};
use chrono::{DateTime, Utc};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{
        Acknowledgment, ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument,
        WriteConcern,
    },
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config::redact_uri;
use crate::errors::{ConnectionError, QueryError};
use crate::state::backend::{Connector, Session, TextBackend};
use crate::state::record::TextRecord;

/// Database used when the connection string does not name one.
const FALLBACK_DATABASE: &str = "test";

const DUPLICATE_KEY: i32 = 11000;

/// On-disk document shape. Field names match the existing collection.
#[derive(Debug, Serialize, Deserialize)]
struct TextDocument {
    number: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at: BsonDateTime,
}

impl From<TextDocument> for TextRecord {
    fn from(doc: TextDocument) -> Self {
        Self {
            key: doc.number,
            text: doc.text.unwrap_or_default(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

/// Opens MongoDB sessions with majority write concern and retryable writes.
pub struct MongoConnector {
    uri: String,
    collection: String,
    heartbeat_interval: Duration,
}

impl MongoConnector {
    pub fn new(uri: impl Into<String>, collection: impl Into<String>, heartbeat_interval: Duration) -> Self {
        Self {
            uri: uri.into(),
            collection: collection.into(),
            heartbeat_interval,
        }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self) -> Result<Session, ConnectionError> {
        let mut options = ClientOptions::parse(&self.uri).await?;
        options.retry_writes = Some(true);
        options.write_concern = Some(WriteConcern::builder().w(Acknowledgment::Majority).build());
        options.app_name.get_or_insert_with(|| env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));

        ping(&database).await?;

        let collection = database.collection::<TextDocument>(&self.collection);
        let unique_number = IndexModel::builder()
            .keys(doc! { "number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let ensured = collection.create_index(unique_number, None).await;
        if tolerate_index_failure(ensured, &self.collection).is_some() {
            tracing::debug!(
                database = %database.name(),
                collection = %self.collection,
                "Unique index on `number` ensured"
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(liveness_probe(database, self.heartbeat_interval, tx));

        Ok(Session {
            backend: Arc::new(MongoBackend { collection }),
            disconnected: rx,
        })
    }

    fn describe(&self) -> String {
        redact_uri(&self.uri)
    }
}

/// A missing index is a data problem, not a connection problem: log it and
/// keep the session.
fn tolerate_index_failure<T>(result: mongodb::error::Result<T>, collection: &str) -> Option<T> {
    match result {
        Ok(created) => Some(created),
        Err(e) => {
            tracing::warn!(
                collection,
                error = %e,
                "Could not ensure unique index on `number`; continuing without it"
            );
            None
        }
    }
}

async fn ping(database: &Database) -> mongodb::error::Result<()> {
    database.run_command(doc! { "ping": 1 }, None).await?;
    Ok(())
}

/// Background task that pings the server until the first failure.
///
/// Exits quietly once the session's receiver has been dropped.
async fn liveness_probe(
    database: Database,
    every: Duration,
    lost: mpsc::UnboundedSender<String>,
) {
    loop {
        tokio::select! {
            _ = lost.closed() => return,
            _ = sleep(every) => {}
        }

        if let Err(e) = ping(&database).await {
            tracing::debug!(error = %e, "Liveness probe failed");
            let _ = lost.send(e.to_string());
            return;
        }
    }
}

struct MongoBackend {
    collection: Collection<TextDocument>,
}

impl MongoBackend {
    async fn find_one_and_set(
        &self,
        key: &str,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> mongodb::error::Result<Option<TextDocument>> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(
                doc! { "number": key },
                doc! {
                    "$set": {
                        "text": text,
                        "updatedAt": BsonDateTime::from_chrono(updated_at),
                    }
                },
                options,
            )
            .await
    }
}

#[async_trait]
impl TextBackend for MongoBackend {
    async fn find(&self, key: &str) -> Result<Option<TextRecord>, QueryError> {
        let found = self
            .collection
            .find_one(doc! { "number": key }, None)
            .await?;
        Ok(found.map(TextRecord::from))
    }

    async fn upsert(
        &self,
        key: &str,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<TextRecord, QueryError> {
        // Two first-writes to one key can race on the unique index; the loser
        // retries once and lands as a plain update.
        let written = match self.find_one_and_set(key, text, updated_at).await {
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!(key, "Upsert raced on unique index, retrying");
                self.find_one_and_set(key, text, updated_at).await?
            }
            other => other?,
        };

        written
            .map(TextRecord::from)
            .ok_or_else(|| QueryError::MissingUpsertResult(key.to_string()))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => cmd.code == DUPLICATE_KEY,
        ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY,
        _ => false,
    }
}
