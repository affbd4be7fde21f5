//! Offline demo provider.
//!
//! Used when no vendor is configured. Answers are deterministic so the rest
//! of the pipeline can be exercised without network access.

use crate::llm::error::LLMError;
use crate::llm::provider::Provider;
use async_trait::async_trait;

const CANNED_ANSWERS: &[(&str, &str)] = &[
    (
        "hello",
        "Hello! I'm an AI assistant and happy to help. What can I do for you?",
    ),
    (
        "hi",
        "Hi there! I'm an AI assistant and happy to help. What can I do for you?",
    ),
    ("goodbye", "Goodbye! Have a great day!"),
    ("thanks", "You're welcome! Glad I could help."),
    (
        "who are you",
        "I'm an AI assistant that answers questions for this service.",
    ),
];

/// Demo provider with canned answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Creates the demo provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the answer for `question` without going through the trait.
    #[must_use]
    pub fn answer(question: &str) -> String {
        let key = question.trim().to_lowercase();
        let key = key.trim_end_matches(['?', '!', '.']);

        CANNED_ANSWERS
            .iter()
            .find(|(q, _)| *q == key)
            .map(|(_, a)| (*a).to_string())
            .unwrap_or_else(|| {
                format!(
                    "Thanks for your question: \"{}\". This is a simulated answer because the \
                     service is running in demo mode. Configure an LLM provider to get real answers.",
                    question.trim()
                )
            })
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn ask(&self, question: &str) -> Result<String, LLMError> {
        Ok(Self::answer(question))
    }

    fn name(&self) -> &str {
        "Mock Provider (demo mode)"
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_answers_ignore_case_and_punctuation() {
        assert_eq!(MockProvider::answer("Hello"), MockProvider::answer("hello!"));
        assert!(MockProvider::answer("  WHO ARE YOU? ").contains("AI assistant"));
    }

    #[test]
    fn unknown_question_is_quoted() {
        let answer = MockProvider::answer("What is Rust?");
        assert!(answer.contains("\"What is Rust?\""));
        assert!(answer.contains("demo mode"));
    }

    #[tokio::test]
    async fn ask_is_deterministic() {
        let provider = MockProvider::new();
        let first = provider.ask("Explain ownership").await.unwrap();
        let second = provider.ask("Explain ownership").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn check_connection_always_passes() {
        assert!(MockProvider::new().check_connection().await.is_ok());
    }
}
