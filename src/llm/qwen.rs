//! Alibaba DashScope (Qwen / Tongyi) text generation client.

use crate::llm::client::SYSTEM_PROMPT;
use crate::llm::config::ProviderConfig;
use crate::llm::error::LLMError;
use crate::llm::http::{build_client, map_reqwest_error, read_json};
use crate::llm::provider::Provider;
use crate::llm::types::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
const DEFAULT_MODEL: &str = "qwen-turbo";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for DashScope text generation. Ask-only.
#[derive(Debug, Clone)]
pub struct QwenProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationInput {
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    result_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    output: Option<GenerationOutput>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    message: ChatMessage,
}

impl GenerationResponse {
    fn into_text(self) -> Option<String> {
        let choice = self.output?.choices.into_iter().next()?;
        choice.message.content.map(|content| content.text())
    }
}

impl QwenProvider {
    /// Creates a DashScope client.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        let timeout = config.timeout_or(DEFAULT_TIMEOUT);
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: config.api_url_or(DEFAULT_ENDPOINT),
            api_key: config.api_key.clone(),
            model: config.model_or(DEFAULT_MODEL),
            timeout,
        })
    }

    fn request_body<'a>(&'a self, question: &str) -> GenerationRequest<'a> {
        GenerationRequest {
            model: &self.model,
            input: GenerationInput {
                messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)],
            },
            parameters: GenerationParameters {
                result_format: "message",
            },
        }
    }
}

#[async_trait]
impl Provider for QwenProvider {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(question))
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        read_json::<GenerationResponse>(response, self.timeout)
            .await?
            .into_text()
            .ok_or_else(|| LLMError::parse_error("response contained no output message"))
    }

    fn name(&self) -> &str {
        "Alibaba Qwen"
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        debug!(provider = self.name(), "connection check is static");
        Ok(())
    }
}
