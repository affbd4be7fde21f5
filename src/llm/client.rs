//! Provider client: the single entry point to whichever vendor is configured.
//!
//! The vendor is selected and its capabilities resolved once, at
//! construction. Afterwards the client is immutable and shared across
//! requests behind an `Arc`.

use crate::llm::config::{ProviderConfig, ProviderKind};
use crate::llm::error::LLMError;
use crate::llm::gemini::GeminiProvider;
use crate::llm::mock::MockProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::provider::{ChatProvider, Provider};
use crate::llm::qwen::QwenProvider;
use crate::llm::sse::FragmentStream;
use crate::llm::types::{ChatCompletionRequest, ChatMessage};
use crate::llm::wenxin::WenxinProvider;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// System instruction sent ahead of every user question.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Model used for streamed requests when none is configured.
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// A provider together with the capabilities it was found to have.
#[derive(Debug, Clone)]
pub enum ProviderHandle {
    /// Answers single questions only
    Basic(Arc<dyn Provider>),
    /// Also speaks streamed chat completions
    Streaming(Arc<dyn ChatProvider>),
}

impl ProviderHandle {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        match self {
            Self::Basic(provider) => provider.ask(question).await,
            Self::Streaming(provider) => provider.ask(question).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Basic(provider) => provider.name(),
            Self::Streaming(provider) => provider.name(),
        }
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        match self {
            Self::Basic(provider) => provider.check_connection().await,
            Self::Streaming(provider) => provider.check_connection().await,
        }
    }
}

/// Summary of the selected provider, as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Display name
    pub provider: String,
    /// Always "active" once constructed
    pub status: &'static str,
    /// Whether streamed answers are available
    pub streaming: bool,
}

/// Uniform facade over the configured provider.
#[derive(Debug)]
pub struct ProviderClient {
    config: ProviderConfig,
    handle: ProviderHandle,
}

impl ProviderClient {
    /// Selects and builds the provider named by `config`.
    ///
    /// Never fails: empty or unknown vendor names, and vendors whose client
    /// cannot be built, fall back to the demo provider with a log line.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let handle = match config.kind() {
            Some(kind) => match build_handle(kind, &config) {
                Ok(handle) => handle,
                Err(e) => {
                    error!(provider = %kind, error = %e, "failed to build LLM provider; using mock provider");
                    mock_handle()
                }
            },
            None if config.name.trim().is_empty() => {
                info!("no LLM provider configured; using mock provider");
                mock_handle()
            }
            None => {
                warn!(provider = %config.name, "unknown LLM provider; using mock provider");
                mock_handle()
            }
        };

        info!(
            provider = handle.name(),
            streaming = matches!(handle, ProviderHandle::Streaming(_)),
            "LLM provider selected"
        );

        Self { config, handle }
    }

    /// Wraps an already-built provider.
    #[must_use]
    pub fn with_handle(config: ProviderConfig, handle: ProviderHandle) -> Self {
        Self { config, handle }
    }

    /// Asks the selected provider a single question.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    pub async fn ask(&self, question: &str) -> Result<String, LLMError> {
        self.handle.ask(question).await
    }

    /// True iff the selected provider can stream.
    #[must_use]
    pub fn supports_streaming(&self) -> bool {
        matches!(self.handle, ProviderHandle::Streaming(_))
    }

    /// Starts a streamed answer to `question`.
    ///
    /// # Errors
    ///
    /// Returns an unsupported-operation error, without contacting the
    /// vendor, when the provider cannot stream.
    pub fn stream_chat(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, LLMError> {
        let ProviderHandle::Streaming(ref provider) = self.handle else {
            return Err(LLMError::unsupported("streaming chat", self.handle.name()));
        };

        Ok(provider.chat_completion_stream(self.question_request(question), cancel))
    }

    fn question_request(&self, question: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.config.model_or(FALLBACK_MODEL),
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)],
        )
        .streaming()
    }

    /// Runs the provider's liveness probe.
    ///
    /// # Errors
    ///
    /// Returns whatever the probe observed.
    pub async fn check_connection(&self) -> Result<(), LLMError> {
        self.handle.check_connection().await
    }

    /// Display name of the selected provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.handle.name()
    }

    /// Summary for status reporting.
    #[must_use]
    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: self.provider_name().to_string(),
            status: "active",
            streaming: self.supports_streaming(),
        }
    }

    /// The configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

fn mock_handle() -> ProviderHandle {
    ProviderHandle::Basic(Arc::new(MockProvider::new()))
}

fn build_handle(kind: ProviderKind, config: &ProviderConfig) -> Result<ProviderHandle, LLMError> {
    let handle = match kind {
        ProviderKind::OpenAI => ProviderHandle::Streaming(Arc::new(OpenAIProvider::for_openai(config)?)),
        ProviderKind::Bella => ProviderHandle::Streaming(Arc::new(OpenAIProvider::for_bella(config)?)),
        ProviderKind::Gemini => ProviderHandle::Basic(Arc::new(GeminiProvider::new(config)?)),
        ProviderKind::Qwen => ProviderHandle::Basic(Arc::new(QwenProvider::new(config)?)),
        ProviderKind::Wenxin => ProviderHandle::Basic(Arc::new(WenxinProvider::new(config)?)),
        ProviderKind::Mock => mock_handle(),
    };
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::sse::fragment_channel;
    use crate::llm::types::ChatCompletionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Streaming double that records the last request it was handed.
    #[derive(Debug, Default)]
    struct RecordingProvider {
        last_request: Mutex<Option<ChatCompletionRequest>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn ask(&self, question: &str) -> Result<String, LLMError> {
            Ok(format!("echo: {}", question))
        }

        fn name(&self) -> &str {
            "Recording"
        }

        async fn check_connection(&self) -> Result<(), LLMError> {
            Err(LLMError::network("offline"))
        }
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        async fn chat_completion(
            &self,
            _request: ChatCompletionRequest,
        ) -> Result<ChatCompletionResponse, LLMError> {
            Err(LLMError::network("offline"))
        }

        fn chat_completion_stream(
            &self,
            request: ChatCompletionRequest,
            _cancel: CancellationToken,
        ) -> FragmentStream {
            *self.last_request.lock().unwrap() = Some(request);
            let (_sink, stream) = fragment_channel();
            stream
        }
    }

    #[test]
    fn unknown_vendor_falls_back_to_mock() {
        let client = ProviderClient::new(ProviderConfig::new("skynet"));
        assert_eq!(client.provider_name(), "Mock Provider (demo mode)");
        assert!(!client.supports_streaming());
    }

    #[test]
    fn empty_vendor_falls_back_to_mock() {
        let client = ProviderClient::new(ProviderConfig::new(""));
        assert_eq!(client.provider_name(), "Mock Provider (demo mode)");
    }

    #[test]
    fn vendor_name_is_case_insensitive() {
        let client = ProviderClient::new(ProviderConfig::new("OpenAI").with_api_key("sk-test"));
        assert_eq!(client.provider_name(), "OpenAI");
        assert!(client.supports_streaming());
    }

    #[test]
    fn ask_only_vendors_do_not_stream() {
        for name in ["gemini", "tongyi", "baidu"] {
            let client = ProviderClient::new(ProviderConfig::new(name));
            assert!(!client.supports_streaming(), "{} should not stream", name);
        }
    }

    #[test]
    fn stream_chat_unsupported_on_mock() {
        let client = ProviderClient::new(ProviderConfig::mock());
        let error = client
            .stream_chat("hi", CancellationToken::new())
            .unwrap_err();
        assert!(error.is_unsupported());
    }

    #[test]
    fn stream_chat_builds_two_message_request() {
        let provider = Arc::new(RecordingProvider::default());
        let client = ProviderClient::with_handle(
            ProviderConfig::new("recording"),
            ProviderHandle::Streaming(provider.clone()),
        );

        client
            .stream_chat("What is Rust?", CancellationToken::new())
            .unwrap();

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert!(request.stream);
        assert_eq!(request.model, FALLBACK_MODEL);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].text(), SYSTEM_PROMPT);
        assert_eq!(request.messages[1].text(), "What is Rust?");
    }

    #[test]
    fn stream_chat_uses_configured_model() {
        let provider = Arc::new(RecordingProvider::default());
        let client = ProviderClient::with_handle(
            ProviderConfig::new("recording").with_model("gpt-4o-mini"),
            ProviderHandle::Streaming(provider.clone()),
        );

        client.stream_chat("hi", CancellationToken::new()).unwrap();

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn ask_and_probe_delegate() {
        let client = ProviderClient::with_handle(
            ProviderConfig::new("recording"),
            ProviderHandle::Streaming(Arc::new(RecordingProvider::default())),
        );

        assert_eq!(client.ask("ping").await.unwrap(), "echo: ping");
        assert!(client.check_connection().await.is_err());
    }

    #[test]
    fn info_reports_capability() {
        let info = ProviderClient::new(ProviderConfig::mock()).info();
        assert_eq!(info.status, "active");
        assert!(!info.streaming);
    }
}
