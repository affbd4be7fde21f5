//! # qa-stream: streamed LLM question answering
//!
//! A question-answering service that records every question, asks a
//! configured LLM vendor for the answer, and relays the answer to the caller
//! either in one response or incrementally as server-sent events.
//!
//! ## Architecture
//!
//! - **LLM**: one provider per vendor behind a uniform [`llm::ProviderClient`],
//!   with a server-sent-events decoder for streamed answers
//! - **Orchestrator**: the per-request state machine that persists the
//!   question, relays fragments, and stores the final answer exactly once
//! - **Emitter**: the outbound event channel the HTTP layer drains
//! - **Storage**: question-answer records in libSQL
//! - **Server**: axum routes, caller identity, and JSON envelopes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qa_stream::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServiceError> {
//!     let store = SqlStore::open(&StorageConfig::in_memory()).await?;
//!     let client = ProviderClient::new(ProviderConfig::mock());
//!     let orchestrator = QueryOrchestrator::new(Arc::new(store), Arc::new(client));
//!
//!     let record = orchestrator.ask("Hello", None).await?;
//!     println!("{}", record.answer);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod qa;
pub mod server;
pub mod storage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::{ServiceError, ServiceErrorKind};
    pub use crate::llm::{
        ChatProvider, LLMError, Provider, ProviderClient, ProviderConfig, ProviderKind,
        StreamFragment,
    };
    pub use crate::qa::{
        AnswerRecord, EventEmitter, EventReceiver, QueryOrchestrator, QueryState, StreamEvent,
        StreamOutcome,
    };
    pub use crate::server::AppState;
    pub use crate::storage::{
        MemoryStore, QaRecord, QaStore, RecordId, SqlStore, StorageConfig, UserId,
    };
}
