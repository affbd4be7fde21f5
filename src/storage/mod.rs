//! Question-answer record storage.
//!
//! The orchestrator depends only on the [`QaStore`] contract. Two stores are
//! provided: [`SqlStore`] on libSQL for deployments and [`MemoryStore`] for
//! tests and throwaway demos.
//!
//! Each write is a single-row statement keyed by the identity returned from
//! [`QaStore::create_placeholder`], so concurrent requests never contend on
//! the same row.

mod error;
mod memory;
mod model;
mod sql;

pub use error::{StorageAccess, StorageError, StorageErrorKind};
pub use memory::MemoryStore;
pub use model::{InvalidUserId, QaRecord, RecordId, UserId};
pub use sql::{SqlStore, StorageConfig};

use async_trait::async_trait;

/// Storage contract for question-answer records.
#[async_trait]
pub trait QaStore: Send + Sync + std::fmt::Debug {
    /// Creates a record with an empty answer and returns its identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn create_placeholder(
        &self,
        question: &str,
        user_id: Option<UserId>,
    ) -> Result<RecordId, StorageError>;

    /// Replaces the answer of an existing record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown identity, or the underlying
    /// failure if the update fails.
    async fn set_answer(&self, record_id: RecordId, answer: &str) -> Result<(), StorageError>;

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown identity.
    async fn get_record(&self, record_id: RecordId) -> Result<QaRecord, StorageError>;

    /// Lists all records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list_records(&self) -> Result<Vec<QaRecord>, StorageError>;

    /// Lists one caller's records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list_records_for_user(&self, user_id: UserId) -> Result<Vec<QaRecord>, StorageError>;
}
