//! OpenAI-compatible chat completions client.
//!
//! Serves both OpenAI itself and gateways that expose the same API (Bella).
//! This is the only provider family that supports streamed answers.

use crate::llm::client::SYSTEM_PROMPT;
use crate::llm::config::ProviderConfig;
use crate::llm::error::LLMError;
use crate::llm::http::{build_client, error_from_response, map_reqwest_error, read_json};
use crate::llm::provider::{ChatProvider, Provider};
use crate::llm::sse::{fragment_channel, FragmentSink, FragmentStream};
use crate::llm::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Upper bound on the liveness probe, independent of the request timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-vendor defaults for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy)]
struct Flavor {
    name: &'static str,
    endpoint: &'static str,
    model: &'static str,
    timeout: Duration,
}

const OPENAI: Flavor = Flavor {
    name: "OpenAI",
    endpoint: "https://api.openai.com/v1/chat/completions",
    model: "gpt-3.5-turbo",
    timeout: Duration::from_secs(30),
};

const BELLA: Flavor = Flavor {
    name: "Bella",
    endpoint: "https://api.bella.com/v1/chat/completions",
    model: "gpt-4o",
    timeout: Duration::from_secs(60),
};

/// Client for OpenAI-compatible chat completions endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    /// HTTP client
    client: Client,
    /// Full chat completions URL
    endpoint: String,
    /// Bearer credential, omitted when empty
    api_key: Option<String>,
    /// Model name
    model: String,
    /// Request timeout the client was built with
    timeout: Duration,
    /// Display name
    name: &'static str,
}

impl OpenAIProvider {
    /// Creates a client for the OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn for_openai(config: &ProviderConfig) -> Result<Self, LLMError> {
        Self::with_flavor(config, OPENAI)
    }

    /// Creates a client for the Bella gateway.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn for_bella(config: &ProviderConfig) -> Result<Self, LLMError> {
        Self::with_flavor(config, BELLA)
    }

    fn with_flavor(config: &ProviderConfig, flavor: Flavor) -> Result<Self, LLMError> {
        let timeout = config.timeout_or(flavor.timeout);
        let api_key = Some(config.api_key.trim().to_string()).filter(|k| !k.is_empty());

        Ok(Self {
            client: build_client(timeout)?,
            endpoint: config.api_url_or(flavor.endpoint),
            api_key,
            model: config.model_or(flavor.model),
            timeout,
            name: flavor.name,
        })
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The model used by [`Provider::ask`].
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Builds the request with optional authorization header.
    fn build_request(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(body);

        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        request
    }

    fn question_request(&self, question: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)],
        )
    }

    /// Drives one streamed request on its own task.
    async fn run_stream(
        self,
        request: ChatCompletionRequest,
        sink: FragmentSink,
        cancel: CancellationToken,
    ) {
        let send = self
            .build_request(&request)
            .header("Accept", "text/event-stream")
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(provider = self.name, "stream request cancelled before response");
                return;
            }
            response = send => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                sink.fail(map_reqwest_error(e, self.timeout)).await;
                return;
            }
        };

        if !response.status().is_success() {
            sink.fail(error_from_response(response).await).await;
            return;
        }

        trace!(provider = self.name, model = %request.model, "upstream stream opened");
        sink.decode(response.bytes_stream(), &cancel).await;
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        let response = self.chat_completion(self.question_request(question)).await?;

        response
            .first_text()
            .ok_or_else(|| LLMError::parse_error("response contained no choices"))
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        let probe = self.question_request("Hello").with_max_tokens(1);

        match tokio::time::timeout(PROBE_TIMEOUT, self.chat_completion(probe)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(LLMError::timeout(PROBE_TIMEOUT)),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    async fn chat_completion(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LLMError> {
        request.stream = false;

        let response = self
            .build_request(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        read_json(response, self.timeout).await
    }

    fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> FragmentStream {
        let (sink, stream) = fragment_channel();
        let this = self.clone();
        tokio::spawn(this.run_stream(request.streaming(), sink, cancel));
        stream
    }
}
