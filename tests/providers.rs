//! Vendor wire tests against a local mock HTTP server.

use qa_stream::llm::{
    ChatProvider, GeminiProvider, LLMErrorKind, OpenAIProvider, Provider, ProviderClient,
    ProviderConfig, QwenProvider, WenxinProvider,
};
use qa_stream::llm::types::{ChatCompletionRequest, ChatMessage};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new("openai")
        .with_api_key("sk-test")
        .with_api_url(format!("{}/v1/chat/completions", server.uri()))
        .with_timeout(Duration::from_secs(5))
}

fn sse_body(parts: &[&str]) -> String {
    let mut body = String::new();
    for part in parts {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"index": 0, "delta": {"content": part}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn openai_stream_decodes_fragments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["Hel", "lo", "!"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAIProvider::for_openai(&openai_config(&server)).unwrap();
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hi")]);

    let (fragments, error) = provider
        .chat_completion_stream(request, CancellationToken::new())
        .collect()
        .await;

    assert!(error.is_none());
    let text: String = fragments.iter().filter_map(|f| f.content_delta()).collect();
    assert_eq!(text, "Hello!");
}

#[tokio::test]
async fn openai_stream_error_status_goes_to_error_outlet() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"type": "invalid_api_key", "message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let client = ProviderClient::new(openai_config(&server));
    assert!(client.supports_streaming());

    let (fragments, error) = client
        .stream_chat("Hi", CancellationToken::new())
        .unwrap()
        .collect()
        .await;

    assert!(fragments.is_empty());
    let error = error.unwrap();
    assert!(matches!(error.kind, LLMErrorKind::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn openai_ask_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "You are a helpful AI assistant."},
                {"role": "user", "content": "What is Rust?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A systems language."},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAIProvider::for_openai(&openai_config(&server)).unwrap();
    assert_eq!(provider.ask("What is Rust?").await.unwrap(), "A systems language.");
}

#[tokio::test]
async fn rate_limit_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let provider = OpenAIProvider::for_openai(&openai_config(&server)).unwrap();
    let error = provider.ask("Hi").await.unwrap_err();

    assert!(error.is_retriable());
    assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn gemini_uses_generate_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Bonjour"}]}}]
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new("google")
        .with_api_key("g-key")
        .with_api_url(format!("{}/", server.uri()));
    let provider = GeminiProvider::new(&config).unwrap();

    assert_eq!(provider.ask("Hello").await.unwrap(), "Bonjour");
}

#[tokio::test]
async fn gemini_probe_reports_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"status": "PERMISSION_DENIED", "message": "API key not valid"}
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new("gemini")
        .with_api_key("bad")
        .with_api_url(server.uri());
    let provider = GeminiProvider::new(&config).unwrap();

    let error = provider.check_connection().await.unwrap_err();
    assert!(matches!(error.kind, LLMErrorKind::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn qwen_reads_message_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer q-key"))
        .and(body_partial_json(json!({
            "model": "qwen-turbo",
            "parameters": {"result_format": "message"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"choices": [{"message": {"role": "assistant", "content": "你好"}}]}
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new("tongyi")
        .with_api_key("q-key")
        .with_api_url(server.uri());
    let provider = QwenProvider::new(&config).unwrap();

    assert_eq!(provider.ask("hi").await.unwrap(), "你好");
}

#[tokio::test]
async fn wenxin_passes_access_token_and_maps_auth_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("access_token", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("access_token", "expired"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error_code": 111,
            "error_msg": "Access token expired"
        })))
        .mount(&server)
        .await;

    let good = WenxinProvider::new(
        &ProviderConfig::new("baidu")
            .with_api_key("good")
            .with_api_url(server.uri()),
    )
    .unwrap();
    assert_eq!(good.ask("hi").await.unwrap(), "ok");

    let expired = WenxinProvider::new(
        &ProviderConfig::new("baidu")
            .with_api_key("expired")
            .with_api_url(server.uri()),
    )
    .unwrap();
    let error = expired.ask("hi").await.unwrap_err();
    assert!(matches!(error.kind, LLMErrorKind::AuthenticationFailed { .. }));
}
