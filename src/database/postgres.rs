use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use super::{EntryStore, FinancialEntry, NewEntry, StoreError};
use crate::config::DatabaseConfig;
use crate::types::EntryType;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS financial_entries (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        entry_type TEXT NOT NULL,
        data JSONB NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS financial_entries_user_idx ON financial_entries (user_id, timestamp)";

/// Postgres-backed entry store
pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    /// Connect and make sure the `financial_entries` table exists
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        info!("Connected financial entry store to Postgres");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_USER_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    fn entry_from_row(row: &PgRow) -> Result<FinancialEntry, StoreError> {
        let raw_type: String = row.try_get("entry_type")?;
        let entry_type = EntryType::parse(&raw_type)
            .ok_or_else(|| StoreError::Backend(format!("unknown entry type in database: {}", raw_type)))?;
        let data: sqlx::types::Json<serde_json::Value> = row.try_get("data")?;

        Ok(FinancialEntry {
            id: row.try_get("id")?,
            user: row.try_get("user_id")?,
            entry_type,
            data: data.0,
            timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait::async_trait]
impl EntryStore for PgEntryStore {
    async fn insert(&self, entry: NewEntry) -> Result<FinancialEntry, StoreError> {
        let query = r#"
            INSERT INTO financial_entries (id, user_id, entry_type, data, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, entry_type, data, timestamp, created_at, updated_at
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(entry.user)
            .bind(entry.entry_type.as_str())
            .bind(sqlx::types::Json(&entry.data))
            .bind(entry.timestamp)
            .fetch_one(&self.pool)
            .await?;

        Self::entry_from_row(&row)
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<FinancialEntry>, StoreError> {
        let query = r#"
            SELECT id, user_id, entry_type, data, timestamp, created_at, updated_at
            FROM financial_entries
            WHERE user_id = $1
            ORDER BY timestamp ASC, created_at ASC
        "#;

        let rows = sqlx::query(query).bind(user).fetch_all(&self.pool).await?;
        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
