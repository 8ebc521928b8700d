use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntryStore, FinancialEntry, NewEntry, StoreError};

/// Process-local store used when no `DATABASE_URL` is configured
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: RwLock<Vec<FinancialEntry>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert(&self, entry: NewEntry) -> Result<FinancialEntry, StoreError> {
        let now = Utc::now();
        let stored = FinancialEntry {
            id: Uuid::new_v4(),
            user: entry.user,
            entry_type: entry.entry_type,
            data: entry.data,
            timestamp: entry.timestamp,
            created_at: now,
            updated_at: now,
        };
        self.entries.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<FinancialEntry>, StoreError> {
        let entries = self.entries.read().await;
        let mut found: Vec<FinancialEntry> = entries.iter().filter(|e| e.user == user).cloned().collect();
        found.sort_by_key(|e| e.timestamp);
        Ok(found)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
