//! Provider configuration.
//!
//! A [`ProviderConfig`] names a vendor and carries the credential, endpoint
//! and model to use with it. Empty fields mean "use the provider's default".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Supported upstream vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAI,
    /// Bella, an OpenAI-compatible gateway
    Bella,
    /// Google Gemini generateContent
    Gemini,
    /// Alibaba DashScope (Qwen / Tongyi)
    Qwen,
    /// Baidu ERNIE (Wenxin)
    Wenxin,
    /// Offline demo provider with canned answers
    Mock,
}

impl ProviderKind {
    /// Maps a configured vendor name to a provider kind.
    ///
    /// Matching ignores case and surrounding whitespace and accepts the
    /// common aliases of each vendor. Returns `None` for empty or unknown
    /// names.
    ///
    /// # Examples
    ///
    /// ```
    /// use qa_stream::llm::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse(" Tongyi "), Some(ProviderKind::Qwen));
    /// assert_eq!(ProviderKind::parse("skynet"), None);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "bella" => Some(Self::Bella),
            "gemini" | "google" => Some(Self::Gemini),
            "ali" | "qwen" | "tongyi" => Some(Self::Qwen),
            "baidu" | "wenxin" => Some(Self::Wenxin),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Bella => "bella",
            Self::Gemini => "gemini",
            Self::Qwen => "qwen",
            Self::Wenxin => "wenxin",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one upstream provider.
///
/// Immutable once handed to the provider client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Vendor name as configured (any case, aliases allowed)
    pub name: String,
    /// Bearer credential (may be empty for the mock provider)
    pub api_key: String,
    /// Endpoint override
    pub api_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Request timeout override
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Creates a configuration for the named vendor with every other field
    /// left at the provider default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a configuration for the offline demo provider.
    #[must_use]
    pub fn mock() -> Self {
        Self::new("mock")
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the endpoint URL. Empty strings are ignored.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = non_empty(api_url.into());
        self
    }

    /// Sets the model. Empty strings are ignored.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = non_empty(model.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolved vendor, or `None` if the name is empty or unknown.
    #[must_use]
    pub fn kind(&self) -> Option<ProviderKind> {
        ProviderKind::parse(&self.name)
    }

    /// Endpoint URL, falling back to `default`.
    #[must_use]
    pub fn api_url_or(&self, default: &str) -> String {
        self.api_url.clone().unwrap_or_else(|| default.to_string())
    }

    /// Model name, falling back to `default`.
    #[must_use]
    pub fn model_or(&self, default: &str) -> String {
        self.model.clone().unwrap_or_else(|| default.to_string())
    }

    /// Timeout, falling back to `default`.
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ProviderKind::parse("OpenAI"), Some(ProviderKind::OpenAI));
        assert_eq!(ProviderKind::parse("BELLA"), Some(ProviderKind::Bella));
        assert_eq!(ProviderKind::parse("  mock\n"), Some(ProviderKind::Mock));
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(ProviderKind::parse("google"), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("ali"), Some(ProviderKind::Qwen));
        assert_eq!(ProviderKind::parse("qwen"), Some(ProviderKind::Qwen));
        assert_eq!(ProviderKind::parse("baidu"), Some(ProviderKind::Wenxin));
        assert_eq!(ProviderKind::parse("wenxin"), Some(ProviderKind::Wenxin));
    }

    #[test]
    fn parse_rejects_empty_and_unknown() {
        assert_eq!(ProviderKind::parse(""), None);
        assert_eq!(ProviderKind::parse("   "), None);
        assert_eq!(ProviderKind::parse("claude"), None);
    }

    #[test]
    fn builder_ignores_blank_overrides() {
        let config = ProviderConfig::new("openai")
            .with_api_key("sk-test")
            .with_api_url("")
            .with_model("  ");

        assert_eq!(config.api_url, None);
        assert_eq!(config.model, None);
        assert_eq!(config.model_or("gpt-3.5-turbo"), "gpt-3.5-turbo");
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ProviderConfig::new("bella")
            .with_api_url("http://localhost:9000/v1/chat/completions")
            .with_model("gpt-4o-mini")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(
            config.api_url_or("https://unused"),
            "http://localhost:9000/v1/chat/completions"
        );
        assert_eq!(config.model_or("gpt-4o"), "gpt-4o-mini");
        assert_eq!(
            config.timeout_or(Duration::from_secs(60)),
            Duration::from_secs(5)
        );
        assert_eq!(config.kind(), Some(ProviderKind::Bella));
    }

    #[test]
    fn mock_config() {
        assert_eq!(ProviderConfig::mock().kind(), Some(ProviderKind::Mock));
    }

    #[test]
    fn kind_display_is_canonical() {
        assert_eq!(ProviderKind::Qwen.to_string(), "qwen");
    }
}
