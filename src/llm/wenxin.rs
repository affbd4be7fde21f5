//! Baidu ERNIE (Wenxin) chat client.
//!
//! The credential is passed as the `access_token` query parameter. Obtaining
//! that token from an API key/secret pair is left to the operator.

use crate::llm::config::ProviderConfig;
use crate::llm::error::LLMError;
use crate::llm::http::{build_client, map_reqwest_error, read_json};
use crate::llm::provider::Provider;
use crate::llm::types::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat";
const DEFAULT_MODEL: &str = "eb-instant";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes ERNIE uses for a bad or expired access token.
const AUTH_ERROR_CODES: [i64; 3] = [110, 111, 14];

/// Client for the ERNIE chat API. Ask-only.
#[derive(Debug, Clone)]
pub struct WenxinProvider {
    client: Client,
    endpoint: String,
    access_token: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ErnieRequest {
    messages: Vec<ChatMessage>,
}

/// ERNIE reports failures inside a 200 response.
#[derive(Debug, Deserialize)]
struct ErnieResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_msg: Option<String>,
}

impl ErnieResponse {
    fn into_answer(self) -> Result<String, LLMError> {
        if let Some(code) = self.error_code {
            let message = self.error_msg.unwrap_or_else(|| "unknown error".to_string());
            return Err(if AUTH_ERROR_CODES.contains(&code) {
                LLMError::authentication_failed(message)
            } else {
                LLMError::api_error(200, message, Some(code.to_string()))
            });
        }

        self.result
            .ok_or_else(|| LLMError::parse_error("response contained no result"))
    }
}

impl WenxinProvider {
    /// Creates an ERNIE client.
    ///
    /// Without an `api_url` override the endpoint is the chat base URL
    /// followed by the model path segment.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        let timeout = config.timeout_or(DEFAULT_TIMEOUT);
        let endpoint = match config.api_url {
            Some(ref url) => url.clone(),
            None => format!("{}/{}", DEFAULT_BASE_URL, config.model_or(DEFAULT_MODEL)),
        };

        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            access_token: config.api_key.trim().to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl Provider for WenxinProvider {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        let body = ErnieRequest {
            messages: vec![ChatMessage::user(question)],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("access_token", self.access_token.as_str())])
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        read_json::<ErnieResponse>(response, self.timeout)
            .await?
            .into_answer()
    }

    fn name(&self) -> &str {
        "Baidu ERNIE"
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        if self.access_token.is_empty() {
            return Err(LLMError::invalid_config(
                "llm.api_key",
                "ERNIE needs an access token; set LLM_API_KEY",
            ));
        }
        Ok(())
    }
}
