//! libSQL-backed record store.

use crate::storage::error::StorageError;
use crate::storage::model::{QaRecord, RecordId, UserId};
use crate::storage::QaStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, Row, Rows};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// SQL statements for schema creation.
const CREATE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS qa_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL DEFAULT '',
    user_id INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_qa_records_user_id ON qa_records(user_id);
CREATE INDEX IF NOT EXISTS idx_qa_records_created_at ON qa_records(created_at);
";

const SELECT_COLUMNS: &str = "SELECT id, question, answer, user_id, created_at, updated_at FROM qa_records";

/// Configuration for the SQL store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file, or `:memory:`
    pub db_path: String,
}

impl StorageConfig {
    /// Creates a config with the given database path.
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Creates a config for an in-memory database (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// Returns true if this is an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path == ":memory:"
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new("./qa_database.db")
    }
}

/// Record store on a single libSQL connection.
pub struct SqlStore {
    // Keeps the database handle alive for the connection's lifetime.
    _db: Database,
    conn: Connection,
    path: String,
}

impl std::fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqlStore {
    /// Opens (creating if needed) the database and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(&config.db_path)
            .build()
            .await
            .map_err(|e| StorageError::database_open(&config.db_path, e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::database_open(&config.db_path, e.to_string()))?;

        conn.execute_batch(CREATE_SCHEMA)
            .await
            .map_err(|e| StorageError::schema_init(e.to_string()))?;

        debug!(path = %config.db_path, "record store ready");

        Ok(Self {
            _db: db,
            conn,
            path: config.db_path.clone(),
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::deserialization_failed(format!("bad timestamp '{}': {}", value, e)))
}

fn record_from_row(row: &Row) -> Result<QaRecord, StorageError> {
    let read_err = |e: libsql::Error| StorageError::deserialization_failed(e.to_string());

    let id: i64 = row.get(0).map_err(read_err)?;
    let question: String = row.get(1).map_err(read_err)?;
    let answer: String = row.get(2).map_err(read_err)?;
    let user_id: Option<i64> = row.get(3).map_err(read_err)?;
    let created_at: String = row.get(4).map_err(read_err)?;
    let updated_at: String = row.get(5).map_err(read_err)?;

    Ok(QaRecord {
        id: RecordId::new(id),
        question,
        answer,
        user_id: user_id.map(UserId::new),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

async fn collect_records(mut rows: Rows, operation: &str) -> Result<Vec<QaRecord>, StorageError> {
    let mut records = Vec::new();

    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| StorageError::query_failed(operation, e.to_string()))?
    {
        records.push(record_from_row(&row)?);
    }

    Ok(records)
}

impl SqlStore {
    async fn insert_placeholder(
        &self,
        question: &str,
        user_id: Option<UserId>,
    ) -> Result<RecordId, StorageError> {
        let now = now_timestamp();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO qa_records (question, answer, user_id, created_at, updated_at)
                 VALUES (?1, '', ?2, ?3, ?3) RETURNING id",
                libsql::params![question, user_id.map(UserId::get), now],
            )
            .await
            .map_err(|e| StorageError::query_failed("create_placeholder", e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StorageError::query_failed("create_placeholder", e.to_string()))?
            .ok_or_else(|| {
                StorageError::query_failed("create_placeholder", "insert returned no identity")
            })?;

        let id: i64 = row
            .get(0)
            .map_err(|e| StorageError::deserialization_failed(e.to_string()))?;

        Ok(RecordId::new(id))
    }

    async fn update_answer(&self, record_id: RecordId, answer: &str) -> Result<(), StorageError> {
        let affected = self
            .conn
            .execute(
                "UPDATE qa_records SET answer = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![answer, now_timestamp(), record_id.get()],
            )
            .await
            .map_err(|e| {
                StorageError::query_failed("set_answer", e.to_string()).for_record(record_id)
            })?;

        if affected == 0 {
            return Err(StorageError::not_found(record_id));
        }

        Ok(())
    }
}

#[async_trait]
impl QaStore for SqlStore {
    async fn create_placeholder(
        &self,
        question: &str,
        user_id: Option<UserId>,
    ) -> Result<RecordId, StorageError> {
        self.insert_placeholder(question, user_id)
            .await
            .map_err(StorageError::during_write)
    }

    async fn set_answer(&self, record_id: RecordId, answer: &str) -> Result<(), StorageError> {
        self.update_answer(record_id, answer)
            .await
            .map_err(StorageError::during_write)
    }

    async fn get_record(&self, record_id: RecordId) -> Result<QaRecord, StorageError> {
        let rows = self
            .conn
            .query(&format!("{} WHERE id = ?1", SELECT_COLUMNS), [record_id.get()])
            .await
            .map_err(|e| StorageError::query_failed("get_record", e.to_string()))?;

        collect_records(rows, "get_record")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(record_id))
    }

    async fn list_records(&self) -> Result<Vec<QaRecord>, StorageError> {
        let rows = self
            .conn
            .query(
                &format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS),
                (),
            )
            .await
            .map_err(|e| StorageError::query_failed("list_records", e.to_string()))?;

        collect_records(rows, "list_records").await
    }

    async fn list_records_for_user(&self, user_id: UserId) -> Result<Vec<QaRecord>, StorageError> {
        let rows = self
            .conn
            .query(
                &format!(
                    "{} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
                    SELECT_COLUMNS
                ),
                [user_id.get()],
            )
            .await
            .map_err(|e| StorageError::query_failed("list_records_for_user", e.to_string()))?;

        collect_records(rows, "list_records_for_user").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn memory_store() -> SqlStore {
        SqlStore::open(&StorageConfig::in_memory()).await.unwrap()
    }

    #[test]
    fn storage_config_in_memory() {
        let config = StorageConfig::in_memory();
        assert!(config.is_in_memory());
        assert!(!StorageConfig::default().is_in_memory());
    }

    #[tokio::test]
    async fn placeholder_starts_with_empty_answer() {
        let store = memory_store().await;
        let id = store.create_placeholder("What is Rust?", None).await.unwrap();

        let record = store.get_record(id).await.unwrap();
        assert_eq!(record.question, "What is Rust?");
        assert_eq!(record.answer, "");
        assert_eq!(record.user_id, None);
    }

    #[tokio::test]
    async fn identities_are_distinct() {
        let store = memory_store().await;
        let first = store.create_placeholder("a", None).await.unwrap();
        let second = store.create_placeholder("b", None).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn set_answer_updates_record() {
        let store = memory_store().await;
        let id = store
            .create_placeholder("q", Some(UserId::new(5)))
            .await
            .unwrap();

        store.set_answer(id, "the answer").await.unwrap();

        let record = store.get_record(id).await.unwrap();
        assert_eq!(record.answer, "the answer");
        assert_eq!(record.user_id, Some(UserId::new(5)));
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn set_answer_unknown_record_is_not_found() {
        let store = memory_store().await;
        let error = store.set_answer(RecordId::new(999), "x").await.unwrap_err();
        assert!(error.is_not_found());
        assert!(error.is_write());
    }

    #[tokio::test]
    async fn get_unknown_record_is_not_found() {
        let store = memory_store().await;
        let error = store.get_record(RecordId::new(1)).await.unwrap_err();
        assert!(error.is_not_found());
        assert!(!error.is_write());
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_filter_by_user() {
        let store = memory_store().await;
        let a = store.create_placeholder("a", Some(UserId::new(1))).await.unwrap();
        let b = store.create_placeholder("b", None).await.unwrap();
        let c = store.create_placeholder("c", Some(UserId::new(1))).await.unwrap();

        let all: Vec<RecordId> = store
            .list_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(all, vec![c, b, a]);

        let mine: Vec<RecordId> = store
            .list_records_for_user(UserId::new(1))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, vec![c, a]);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qa.db");
        let config = StorageConfig::new(path.to_string_lossy().to_string());

        let id = {
            let store = SqlStore::open(&config).await.unwrap();
            let id = store.create_placeholder("persist me", None).await.unwrap();
            store.set_answer(id, "persisted").await.unwrap();
            id
        };

        let reopened = SqlStore::open(&config).await.unwrap();
        assert_eq!(reopened.get_record(id).await.unwrap().answer, "persisted");
    }
}
