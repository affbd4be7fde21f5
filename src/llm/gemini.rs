//! Google Gemini `generateContent` client.

use crate::llm::config::ProviderConfig;
use crate::llm::error::{LLMError, LLMErrorKind};
use crate::llm::http::{build_client, map_reqwest_error, read_json};
use crate::llm::provider::Provider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Gemini API. Ask-only.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl GeminiProvider {
    /// Creates a Gemini client.
    ///
    /// `api_url` overrides the API base (not the full method URL).
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        let timeout = config.timeout_or(DEFAULT_TIMEOUT);
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config
                .api_url_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone(),
            model: config.model_or(DEFAULT_MODEL),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: question }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        read_json::<GenerateResponse>(response, self.timeout)
            .await?
            .into_text()
            .ok_or_else(|| LLMError::parse_error("response contained no candidate text"))
    }

    fn name(&self) -> &str {
        "Google Gemini"
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        match self.ask("Hello").await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind, LLMErrorKind::AuthenticationFailed { .. }) => Err(
                LLMError::authentication_failed("Gemini rejected the API key (HTTP 401/403)"),
            ),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint() {
        let provider = GeminiProvider::new(&ProviderConfig::new("gemini")).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let config = ProviderConfig::new("gemini")
            .with_api_url("http://localhost:8081/v1/")
            .with_model("gemini-pro");
        let provider = GeminiProvider::new(&config).unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8081/v1/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn response_text_extraction() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Bonjour"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Bonjour"));
    }

    #[test]
    fn empty_candidates_fail_closed() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(response.into_text().is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(blocked.into_text().is_none());
    }
}
