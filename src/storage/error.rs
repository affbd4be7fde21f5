//! Storage error types.

use crate::storage::model::RecordId;
use std::fmt;

/// Errors raised by a question-answer store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// Record the failing operation was keyed by, if any
    pub record_id: Option<RecordId>,
    /// Whether the failing operation reads or writes
    pub access: StorageAccess,
    /// The specific error that occurred (boxed for size efficiency)
    kind: Box<StorageErrorKind>,
}

/// Direction of the operation a storage error came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageAccess {
    /// A lookup or listing
    #[default]
    Read,
    /// A placeholder insert or answer update
    Write,
}

/// Specific storage error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Failed to open or create the database
    DatabaseOpen {
        /// Path to the database file
        path: String,
        /// Error message from the database
        message: String,
    },
    /// Failed to initialize the schema
    SchemaInit {
        /// Error message from the database
        message: String,
    },
    /// Statement execution failed
    QueryFailed {
        /// The operation that failed
        operation: String,
        /// Error message from the database
        message: String,
    },
    /// No record with the given identity
    NotFound,
    /// A stored row could not be read back
    DeserializationFailed {
        /// Error message
        message: String,
    },
}

impl StorageError {
    /// Creates a new storage error with the given kind.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            record_id: None,
            access: StorageAccess::Read,
            kind: Box::new(kind),
        }
    }

    /// Attaches the record the failing operation targeted.
    #[must_use]
    pub fn for_record(mut self, record_id: RecordId) -> Self {
        self.record_id = Some(record_id);
        self
    }

    /// Marks the error as raised by a write.
    #[must_use]
    pub fn during_write(mut self) -> Self {
        self.access = StorageAccess::Write;
        self
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &StorageErrorKind {
        &self.kind
    }

    /// Creates a database open error.
    #[must_use]
    pub fn database_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::DatabaseOpen {
            path: path.into(),
            message: message.into(),
        })
    }

    /// Creates a schema initialization error.
    #[must_use]
    pub fn schema_init(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::SchemaInit {
            message: message.into(),
        })
    }

    /// Creates a query failed error.
    #[must_use]
    pub fn query_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::QueryFailed {
            operation: operation.into(),
            message: message.into(),
        })
    }

    /// Creates a not found error for `record_id`.
    #[must_use]
    pub fn not_found(record_id: RecordId) -> Self {
        Self::new(StorageErrorKind::NotFound).for_record(record_id)
    }

    /// Creates a deserialization failed error.
    #[must_use]
    pub fn deserialization_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::DeserializationFailed {
            message: message.into(),
        })
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, StorageErrorKind::NotFound)
    }

    /// Returns true if the failing operation was a write.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.access == StorageAccess::Write
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(record_id) = self.record_id {
            write!(f, "record {}: ", record_id)?;
        }

        match self.kind.as_ref() {
            StorageErrorKind::DatabaseOpen { path, message } => {
                write!(
                    f,
                    "failed to open database at '{}': {}; check the path and permissions",
                    path, message
                )
            }
            StorageErrorKind::SchemaInit { message } => {
                write!(f, "failed to initialize database schema: {}", message)
            }
            StorageErrorKind::QueryFailed { operation, message } => {
                write!(f, "database operation '{}' failed: {}", operation, message)
            }
            StorageErrorKind::NotFound => write!(f, "record not found"),
            StorageErrorKind::DeserializationFailed { message } => {
                write!(f, "failed to read stored record: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}
