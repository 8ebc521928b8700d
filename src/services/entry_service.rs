use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::crypto::FieldCipher;
use crate::database::{EntryStore, FinancialEntry, NewEntry, StoreError};

/// Field name used when `data` is sealed before it reaches the store
const SEALED_FIELD: &str = "sealed";

/// Financial entry operations over an opaque store, with optional at-rest
/// encryption of each entry's `data` payload.
#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn EntryStore>,
    cipher: Option<FieldCipher>,
}

impl EntryService {
    pub fn new(store: Arc<dyn EntryStore>, cipher: Option<FieldCipher>) -> Self {
        Self { store, cipher }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn encrypts_at_rest(&self) -> bool {
        self.cipher.is_some()
    }

    pub async fn create(&self, mut entry: NewEntry) -> Result<FinancialEntry, StoreError> {
        if let Some(cipher) = &self.cipher {
            let plain = serde_json::to_string(&entry.data)
                .map_err(|e| StoreError::Backend(format!("serialize entry data: {}", e)))?;
            entry.data = serde_json::json!({ SEALED_FIELD: cipher.encrypt(&plain)? });
        }

        let stored = self.store.insert(entry).await?;
        tracing::info!(
            entry_id = %stored.id,
            entry_type = stored.entry_type.as_str(),
            backend = self.store.backend_name(),
            "financial entry created"
        );
        self.open(stored)
    }

    pub async fn list_for_user(&self, user: Uuid) -> Result<Vec<FinancialEntry>, StoreError> {
        let entries = self.store.list_for_user(user).await?;
        entries.into_iter().map(|entry| self.open(entry)).collect()
    }

    fn open(&self, mut entry: FinancialEntry) -> Result<FinancialEntry, StoreError> {
        let Some(cipher) = &self.cipher else {
            return Ok(entry);
        };
        // Entries written before a key was configured are stored in the clear
        let Some(sealed) = entry.data.get(SEALED_FIELD).and_then(Value::as_str) else {
            return Ok(entry);
        };
        let plain = cipher.decrypt(sealed)?;
        entry.data = serde_json::from_str(&plain)
            .map_err(|e| StoreError::Backend(format!("decode entry data: {}", e)))?;
        Ok(entry)
    }
}
