//! Request-scoped error taxonomy.
//!
//! Every failure that ends a request is a [`ServiceError`]. It carries the
//! underlying cause for logging and exposes a generic, caller-safe message
//! plus the HTTP status the request surface should answer with.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use crate::llm::LLMError;
use crate::storage::StorageError;
use std::fmt;
use std::time::Duration;

/// Retry hint for transient upstream failures that carry no delay of their own.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Errors that terminate a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// The specific error that occurred
    pub kind: ServiceErrorKind,
}

/// Specific service error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The request was rejected before any side effect
    BadRequest {
        /// What was wrong with the request
        reason: String,
    },
    /// A record could not be written or read
    Storage(StorageError),
    /// The upstream provider failed
    Upstream(LLMError),
    /// Streaming was requested from a provider that cannot stream
    UnsupportedOperation {
        /// Display name of the configured provider
        provider: String,
    },
    /// Startup configuration was invalid
    Configuration {
        /// The configuration field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
}

impl ServiceError {
    /// Creates a new ServiceError with the given kind.
    #[must_use]
    pub fn new(kind: ServiceErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::BadRequest {
            reason: reason.into(),
        })
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(error: StorageError) -> Self {
        Self::new(ServiceErrorKind::Storage(error))
    }

    /// Creates an upstream error.
    #[must_use]
    pub fn upstream(error: LLMError) -> Self {
        Self::new(ServiceErrorKind::Upstream(error))
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(provider: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::UnsupportedOperation {
            provider: provider.into(),
        })
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Returns true if this is a bad request error.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::BadRequest { .. })
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::Storage(_))
    }

    /// Returns true if this is an upstream error.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::Upstream(_))
    }

    /// Returns true if this is an unsupported operation error.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ServiceErrorKind::UnsupportedOperation { .. })
    }

    /// Returns true if this is a not-found storage error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(&self.kind, ServiceErrorKind::Storage(e) if e.is_not_found())
    }

    /// How long the caller should wait before asking again.
    ///
    /// Only transient upstream failures have one; a rate limit passes the
    /// provider's own delay through.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ServiceErrorKind::Upstream(e) if e.is_retriable() => {
                Some(e.retry_after().unwrap_or(DEFAULT_RETRY_AFTER))
            }
            _ => None,
        }
    }

    /// HTTP status the request surface answers with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            ServiceErrorKind::BadRequest { .. } => 400,
            ServiceErrorKind::Storage(e) if e.is_not_found() => 404,
            ServiceErrorKind::Storage(_) | ServiceErrorKind::Configuration { .. } => 500,
            ServiceErrorKind::UnsupportedOperation { .. } => 501,
            ServiceErrorKind::Upstream(_) => 503,
        }
    }

    /// Message that is safe to show the caller.
    ///
    /// Storage and upstream details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match &self.kind {
            ServiceErrorKind::BadRequest { reason } => reason.clone(),
            ServiceErrorKind::Storage(e) if e.is_not_found() => "record not found".to_string(),
            ServiceErrorKind::Storage(e) if e.is_write() => "failed to save answer".to_string(),
            ServiceErrorKind::Storage(_) => "failed to load records".to_string(),
            ServiceErrorKind::Upstream(_) => "AI service unavailable".to_string(),
            ServiceErrorKind::UnsupportedOperation { .. } => {
                "streaming is not supported by the configured AI provider".to_string()
            }
            ServiceErrorKind::Configuration { .. } => "service misconfigured".to_string(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ServiceErrorKind::BadRequest { reason } => write!(f, "bad request: {}", reason),
            ServiceErrorKind::Storage(e) => write!(f, "storage error: {}", e),
            ServiceErrorKind::Upstream(e) => write!(f, "upstream error: {}", e),
            ServiceErrorKind::UnsupportedOperation { provider } => write!(
                f,
                "provider '{}' cannot stream answers; use the non-streaming endpoint or \
                 configure a streaming-capable provider",
                provider
            ),
            ServiceErrorKind::Configuration { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ServiceErrorKind::Storage(e) => Some(e),
            ServiceErrorKind::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        Self::storage(error)
    }
}

impl From<LLMError> for ServiceError {
    fn from(error: LLMError) -> Self {
        match error.kind {
            crate::llm::LLMErrorKind::Unsupported { provider, .. } => Self::unsupported(provider),
            _ => Self::upstream(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordId;

    #[test]
    fn status_codes() {
        assert_eq!(ServiceError::bad_request("missing prompt").status_code(), 400);
        assert_eq!(
            ServiceError::storage(StorageError::query_failed("x", "y")).status_code(),
            500
        );
        assert_eq!(
            ServiceError::storage(StorageError::not_found(RecordId::new(1))).status_code(),
            404
        );
        assert_eq!(ServiceError::upstream(LLMError::network("down")).status_code(), 503);
        assert_eq!(ServiceError::unsupported("Mock").status_code(), 501);
    }

    #[test]
    fn retry_hint_only_for_transient_upstream_failures() {
        let limited = ServiceError::upstream(LLMError::rate_limited(Duration::from_secs(12)));
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(12)));

        let timeout = ServiceError::upstream(LLMError::timeout(Duration::from_secs(30)));
        assert_eq!(timeout.retry_after(), Some(DEFAULT_RETRY_AFTER));

        let rejected = ServiceError::upstream(LLMError::authentication_failed("bad key"));
        assert_eq!(rejected.retry_after(), None);
        assert_eq!(ServiceError::bad_request("x").retry_after(), None);
    }

    #[test]
    fn public_message_hides_details() {
        let error = ServiceError::upstream(LLMError::authentication_failed("sk-secret rejected"));
        assert_eq!(error.public_message(), "AI service unavailable");
        assert!(error.to_string().contains("sk-secret rejected"));

        let error = ServiceError::storage(
            StorageError::query_failed("set_answer", "disk full").during_write(),
        );
        assert_eq!(error.public_message(), "failed to save answer");

        let error = ServiceError::storage(StorageError::query_failed("list_records", "locked"));
        assert_eq!(error.public_message(), "failed to load records");

        let error = ServiceError::storage(
            StorageError::deserialization_failed("bad identity column").during_write(),
        );
        assert_eq!(error.public_message(), "failed to save answer");
    }

    #[test]
    fn unsupported_llm_error_converts_to_unsupported_operation() {
        let error: ServiceError = LLMError::unsupported("streaming chat", "Mock").into();
        assert!(error.is_unsupported());

        let error: ServiceError = LLMError::timeout(std::time::Duration::from_secs(1)).into();
        assert!(error.is_upstream());
    }

    #[test]
    fn source_exposes_cause() {
        use std::error::Error;
        let error = ServiceError::upstream(LLMError::network("reset"));
        assert!(error.source().is_some());
        assert!(ServiceError::bad_request("x").source().is_none());
    }
}
