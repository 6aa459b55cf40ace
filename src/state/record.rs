use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single stored text, addressed by its external key ("number").
///
/// `updated_at` is stamped by the store on every write; clients never set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRecord {
    pub key: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

/// Result of a read. A missing key reads as empty text with `exists: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLookup {
    pub text: String,
    pub exists: bool,
}

impl From<Option<TextRecord>> for TextLookup {
    fn from(record: Option<TextRecord>) -> Self {
        match record {
            Some(r) => Self {
                text: r.text,
                exists: true,
            },
            None => Self {
                text: String::new(),
                exists: false,
            },
        }
    }
}
