//! Backend seams: the document store and the account system.
//!
//! `firestore` and `identity` talk to the hosted REST APIs, `memory` keeps
//! everything in process for tests and local runs.

pub mod firestore;
pub mod identity;
pub mod memory;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{UserProfile, VocabularyEntry};

pub use firestore::FirestoreClient;
pub use identity::IdentityClient;
pub use memory::{InMemoryAccounts, InMemoryDocumentStore};

pub const VOCABULARY_COLLECTION: &str = "vocabulary";
pub const USERS_COLLECTION: &str = "users";
pub const WORD_FIELD: &str = "word";

/// Upper bound on writes in a single batch commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// ID token of the signed-in account, shared between the account client
/// (writer) and the document client (reader).
pub type IdTokenSlot = Arc<RwLock<Option<String>>>;

// ============================================================
// Errors
// ============================================================

/// Error reported by the backend, carrying the backend's own code
/// (`auth/wrong-password`, `permission-denied`, ...) and raw message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("unavailable", message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("invalid-argument", message)
    }
}

// ============================================================
// Documents
// ============================================================

/// A typed document field, encoded the way Firestore's REST API does
/// (`{"stringValue": "..."}`, `{"arrayValue": {"values": [...]}}`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    NullValue(Option<()>),
    BooleanValue(bool),
    /// Firestore transmits 64-bit integers as strings.
    IntegerValue(String),
    DoubleValue(f64),
    StringValue(String),
    TimestampValue(DateTime<Utc>),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        FieldValue::StringValue(value.into())
    }

    pub fn integer(value: i64) -> Self {
        FieldValue::IntegerValue(value.to_string())
    }

    pub fn string_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::ArrayValue(ArrayValue {
            values: values.into_iter().map(FieldValue::string).collect(),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::StringValue(value) => Some(value),
            _ => None,
        }
    }

    /// Ordering used by the in-memory store; values of different kinds
    /// are not comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::StringValue(a), FieldValue::StringValue(b)) => Some(a.cmp(b)),
            (FieldValue::BooleanValue(a), FieldValue::BooleanValue(b)) => Some(a.cmp(b)),
            (FieldValue::IntegerValue(a), FieldValue::IntegerValue(b)) => {
                let a = a.parse::<i64>().ok()?;
                let b = b.parse::<i64>().ok()?;
                Some(a.cmp(&b))
            }
            (FieldValue::DoubleValue(a), FieldValue::DoubleValue(b)) => a.partial_cmp(b),
            (FieldValue::TimestampValue(a), FieldValue::TimestampValue(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// A document with its id (last path segment) and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::TimestampValue(ts)) => Some(*ts),
            _ => None,
        }
    }

    pub fn get_string_array(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(FieldValue::ArrayValue(array)) => array
                .values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl VocabularyEntry {
    /// Reads an entry out of a `vocabulary` document. Missing or
    /// mistyped optional fields are treated as absent.
    pub fn from_document(doc: &Document) -> Self {
        let word = doc.get_str(WORD_FIELD).unwrap_or(&doc.id).to_string();
        Self {
            id: doc.id.clone(),
            word,
            adjective: doc.get_str("adjective").map(str::to_string),
            noun: doc.get_str("noun").map(str::to_string),
            example: doc.get_str("example").map(str::to_string),
            synonyms: doc.get_string_array("synonyms"),
            created_at: doc.get_timestamp("createdAt"),
        }
    }

    /// Fields written by the seeding job.
    pub fn to_fields(&self, created_at: DateTime<Utc>) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert(WORD_FIELD.to_string(), FieldValue::string(&self.word));
        let optional = [
            ("adjective", &self.adjective),
            ("noun", &self.noun),
            ("example", &self.example),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                fields.insert(name.to_string(), FieldValue::string(value));
            }
        }
        fields.insert(
            "synonyms".to_string(),
            FieldValue::string_array(self.synonyms.iter().cloned()),
        );
        fields.insert("createdAt".to_string(), FieldValue::TimestampValue(created_at));
        fields
    }
}

// ============================================================
// Queries and writes
// ============================================================

/// Position of the last document of a page; the next page starts strictly
/// after it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub document_id: String,
    pub key: FieldValue,
}

impl PageCursor {
    /// Cursor for `doc` under the given ordering field. `None` when the
    /// document has no value for it.
    pub fn after(doc: &Document, order_by: &str) -> Option<Self> {
        doc.get(order_by).map(|key| Self {
            document_id: doc.id.clone(),
            key: key.clone(),
        })
    }
}

/// A single ascending, cursor-paginated collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub collection: String,
    pub order_by: String,
    pub start_after: Option<PageCursor>,
    pub limit: usize,
}

impl PageQuery {
    pub fn first(collection: &str, order_by: &str, limit: usize) -> Self {
        Self {
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            start_after: None,
            limit,
        }
    }

    pub fn after(mut self, cursor: PageCursor) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetWrite {
    pub collection: String,
    pub document_id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Group of document writes applied atomically on commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<SetWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites (or creates) `collection/document_id` with `fields`.
    pub fn set(
        &mut self,
        collection: &str,
        document_id: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> &mut Self {
        self.writes.push(SetWrite {
            collection: collection.to_string(),
            document_id: document_id.to_string(),
            fields,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[SetWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<SetWrite> {
        self.writes
    }

    pub(crate) fn check_size(&self) -> Result<(), BackendError> {
        if self.writes.len() > MAX_BATCH_WRITES {
            return Err(BackendError::invalid_argument(format!(
                "maximum {} writes allowed per batch, got {}",
                MAX_BATCH_WRITES,
                self.writes.len()
            )));
        }
        Ok(())
    }
}

// ============================================================
// Traits
// ============================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn run_query(&self, query: &PageQuery) -> Result<Vec<Document>, BackendError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError>;
}

/// Email/password account system. State changes are observed through
/// [`crate::auth::AuthSession`], not here.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserProfile, BackendError>;

    /// Sets the display name of the signed-in account.
    async fn update_display_name(&self, display_name: &str) -> Result<UserProfile, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    fn current_user(&self) -> Option<UserProfile>;
}
