//! HTTP plumbing shared by the vendor clients.

use crate::llm::error::LLMError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Fallback wait when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Error envelope used by OpenAI-style and Google-style APIs, plus the flat
/// `{code, message}` shape used by DashScope.
#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    error: Option<VendorErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VendorErrorDetail {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Builds the HTTP client every provider uses.
///
/// # Errors
///
/// Returns `LLMError::network` if the TLS backend cannot be initialized.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, LLMError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::network(format!("failed to create HTTP client: {}", e)))
}

/// Maps a transport failure to a provider error.
pub(crate) fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> LLMError {
    if error.is_timeout() {
        LLMError::timeout(timeout)
    } else if error.is_connect() {
        LLMError::network(format!("connection failed: {}", error))
    } else {
        LLMError::network(error.to_string())
    }
}

/// Converts a non-success response into a provider error.
pub(crate) async fn error_from_response(response: Response) -> LLMError {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return LLMError::rate_limited(Duration::from_secs(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    error_from_body(status, &body)
}

fn error_from_body(status: StatusCode, body: &str) -> LLMError {
    let status_code = status.as_u16();
    let parsed = serde_json::from_str::<VendorErrorBody>(body).ok();

    let (error_type, message) = match parsed {
        Some(VendorErrorBody {
            error: Some(detail),
            ..
        }) => (detail.error_type.or(detail.status), detail.message),
        Some(VendorErrorBody { message, .. }) => (None, message),
        None => (None, None),
    };

    let message = message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            body.trim().to_string()
        }
    });

    match (status_code, error_type.as_deref()) {
        (_, Some("authentication_error" | "invalid_api_key" | "UNAUTHENTICATED")) | (401 | 403, _) => {
            LLMError::authentication_failed(message)
        }
        (_, Some("invalid_request_error")) => LLMError::invalid_request(message),
        _ => LLMError::api_error(status_code, message, error_type),
    }
}

/// Checks the status and decodes a JSON response body.
///
/// # Errors
///
/// Returns the mapped vendor error for non-success statuses and a parse
/// error when the body does not match `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, LLMError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    serde_json::from_str(&body)
        .map_err(|e| LLMError::parse_error(format!("unexpected response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::LLMErrorKind;

    #[test]
    fn openai_auth_error_body() {
        let body = r#"{"error":{"type":"invalid_api_key","message":"Incorrect API key"}}"#;
        let error = error_from_body(StatusCode::BAD_REQUEST, body);
        assert!(matches!(
            error.kind,
            LLMErrorKind::AuthenticationFailed { ref reason } if reason == "Incorrect API key"
        ));
    }

    #[test]
    fn openai_invalid_request_body() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"bad model"}}"#;
        let error = error_from_body(StatusCode::BAD_REQUEST, body);
        assert!(matches!(error.kind, LLMErrorKind::InvalidRequest { .. }));
    }

    #[test]
    fn google_error_body_uses_status_as_type() {
        let body = r#"{"error":{"code":500,"message":"internal","status":"INTERNAL"}}"#;
        let error = error_from_body(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(
            error,
            LLMError::api_error(500, "internal", Some("INTERNAL".to_string()))
        );
    }

    #[test]
    fn flat_error_body() {
        let body = r#"{"code":"InvalidParameter","message":"model not found"}"#;
        let error = error_from_body(StatusCode::BAD_REQUEST, body);
        assert_eq!(error, LLMError::api_error(400, "model not found", None));
    }

    #[test]
    fn forbidden_without_body_is_auth_failure() {
        let error = error_from_body(StatusCode::FORBIDDEN, "");
        assert!(matches!(error.kind, LLMErrorKind::AuthenticationFailed { .. }));
    }

    #[test]
    fn plain_text_body_is_kept() {
        let error = error_from_body(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert_eq!(error, LLMError::api_error(502, "upstream exploded", None));
    }

    #[test]
    fn empty_body_uses_reason_phrase() {
        let error = error_from_body(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(error, LLMError::api_error(503, "Service Unavailable", None));
    }
}
