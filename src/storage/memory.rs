//! In-process record store.

use crate::storage::error::StorageError;
use crate::storage::model::{QaRecord, RecordId, UserId};
use crate::storage::QaStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Record store held entirely in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    records: BTreeMap<RecordId, QaRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    /// Returns true if no record has been created.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn newest_first(mut records: Vec<QaRecord>) -> Vec<QaRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    records
}

#[async_trait]
impl QaStore for MemoryStore {
    async fn create_placeholder(
        &self,
        question: &str,
        user_id: Option<UserId>,
    ) -> Result<RecordId, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.last_id += 1;
        let id = RecordId::new(inner.last_id);
        let now = Utc::now();

        inner.records.insert(
            id,
            QaRecord {
                id,
                question: question.to_string(),
                answer: String::new(),
                user_id,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn set_answer(&self, record_id: RecordId, answer: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .records
            .get_mut(&record_id)
            .ok_or_else(|| StorageError::not_found(record_id).during_write())?;

        record.answer = answer.to_string();
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn get_record(&self, record_id: RecordId) -> Result<QaRecord, StorageError> {
        self.inner
            .lock()
            .await
            .records
            .get(&record_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(record_id))
    }

    async fn list_records(&self) -> Result<Vec<QaRecord>, StorageError> {
        let records = self.inner.lock().await.records.values().cloned().collect();
        Ok(newest_first(records))
    }

    async fn list_records_for_user(&self, user_id: UserId) -> Result<Vec<QaRecord>, StorageError> {
        let records = self
            .inner
            .lock()
            .await
            .records
            .values()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }
}
