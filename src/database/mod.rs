pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::types::EntryType;

pub use memory::MemoryEntryStore;
pub use postgres::PgEntryStore;

/// Errors from entry stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A stored financial record (asset, expense, budget, ...) owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialEntry {
    pub id: Uuid,
    pub user: Uuid,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub user: Uuid,
    pub entry_type: EntryType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl NewEntry {
    /// Build from a raw JSON body: `user`, `type` and object `data` are required
    pub fn from_json(payload: &Value) -> Result<Self, StoreError> {
        let object = payload
            .as_object()
            .ok_or_else(|| StoreError::validation("body", "expected a JSON object"))?;

        let user = object
            .get("user")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::validation("user", "This field is required"))?;
        let user = Uuid::parse_str(user)
            .map_err(|_| StoreError::validation("user", format!("Invalid UUID format: {}", user)))?;

        let entry_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::validation("type", "This field is required"))?;
        let entry_type = EntryType::parse(entry_type).ok_or_else(|| {
            StoreError::validation(
                "type",
                "must be one of asset, expense, budget, retirement, tfsa, stock",
            )
        })?;

        let data = match object.get("data") {
            Some(data @ Value::Object(_)) => data.clone(),
            Some(_) => return Err(StoreError::validation("data", "must be an object")),
            None => return Err(StoreError::validation("data", "This field is required")),
        };

        let timestamp = match object.get("timestamp") {
            None | Some(Value::Null) => Utc::now(),
            Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| StoreError::validation("timestamp", format!("Invalid timestamp format: {}", raw)))?,
            Some(_) => return Err(StoreError::validation("timestamp", "must be an RFC 3339 string")),
        };

        Ok(Self {
            user,
            entry_type,
            data,
            timestamp,
        })
    }
}

/// Opaque datastore for financial entries
#[async_trait::async_trait]
pub trait EntryStore: Send + Sync {
    async fn insert(&self, entry: NewEntry) -> Result<FinancialEntry, StoreError>;

    /// Entries for one user, oldest `timestamp` first
    async fn list_for_user(&self, user: Uuid) -> Result<Vec<FinancialEntry>, StoreError>;

    /// Liveness probe for the health endpoint
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str;
}
