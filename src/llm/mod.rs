//! Upstream LLM providers.
//!
//! This module contains the provider contracts, one client per supported
//! vendor, the server-sent-events decoder used for streamed answers, and the
//! [`ProviderClient`] that selects a vendor from configuration.

mod client;
mod config;
mod error;
mod gemini;
mod http;
mod mock;
mod openai;
mod provider;
mod qwen;
pub mod sse;
pub mod types;
mod wenxin;

pub use client::{
    ProviderClient, ProviderHandle, ProviderInfo, FALLBACK_MODEL, SYSTEM_PROMPT,
};
pub use config::{ProviderConfig, ProviderKind};
pub use error::{LLMError, LLMErrorKind};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAIProvider;
pub use provider::{ChatProvider, Provider};
pub use qwen::QwenProvider;
pub use sse::{fragment_channel, FragmentSink, FragmentStream};
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, StreamFragment};
pub use wenxin::WenxinProvider;
