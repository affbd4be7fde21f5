//! Provider contracts.
//!
//! Every vendor implements [`Provider`]. Vendors that speak the chat
//! completions protocol, including incremental delivery, also implement
//! [`ChatProvider`]. The provider client decides once, at construction,
//! which of the two it holds.

use crate::llm::error::LLMError;
use crate::llm::sse::FragmentStream;
use crate::llm::types::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Base contract every upstream vendor implements.
///
/// # Example
///
/// ```ignore
/// use qa_stream::llm::{MockProvider, Provider};
///
/// let provider = MockProvider::new();
/// let answer = provider.ask("hello").await?;
/// ```
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Asks a single question and returns one complete answer.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success HTTP status, or a
    /// response body that does not contain an answer. An unparsable body is
    /// never reported as an empty answer.
    async fn ask(&self, question: &str) -> Result<String, LLMError>;

    /// Display name of the provider.
    fn name(&self) -> &str;

    /// Best-effort liveness probe.
    ///
    /// # Errors
    ///
    /// Returns the failure the probe observed. Callers treat this as a
    /// warning, never as fatal.
    async fn check_connection(&self) -> Result<(), LLMError>;
}

/// Optional chat completions capability.
#[async_trait]
pub trait ChatProvider: Provider {
    /// Sends a chat completion request and waits for the full response.
    ///
    /// # Errors
    ///
    /// Same failure classes as [`Provider::ask`].
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LLMError>;

    /// Starts a streamed chat completion.
    ///
    /// Returns immediately. The upstream request and body decoding run on a
    /// separate task that stops when `cancel` fires. Connection failures and
    /// non-success statuses arrive on the error outlet.
    fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> FragmentStream;
}
