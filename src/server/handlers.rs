use crate::error::ServiceError;
use crate::qa::{AnswerRecord, EventEmitter, EventReceiver};
use crate::server::identity::CallerIdentity;
use crate::server::response::{ApiResponse, ErrorBody};
use crate::server::AppState;
use crate::storage::{QaRecord, RecordId};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub prompt: Option<String>,
}

impl AskParams {
    fn question(self) -> String {
        self.prompt.unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct AskResponse {
    #[serde(flatten)]
    record: AnswerRecord,
    status: &'static str,
}

// GET /
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": "qa-stream",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "GET /": "API description",
            "GET /api/health": "health check",
            "GET /api/ask": "ask a question (query: prompt)",
            "GET /api/ask/stream": "ask a question, answer streamed as server-sent events (query: prompt)",
            "GET /api/records": "list all question-answer records",
            "GET /api/records/{id}": "get one record",
            "GET /api/user/records": "list the caller's records (requires identity)",
        },
    }))
}

// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": {
            "database": "ok",
            "llm": "ok",
        },
        "llm_provider": state.orchestrator().client().info(),
    }))
}

// GET /api/ask?prompt=
pub async fn ask(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<AskParams>,
) -> Result<Json<impl Serialize>, ServiceError> {
    let record = state
        .orchestrator()
        .ask(&params.question(), caller.user_id())
        .await?;

    Ok(Json(AskResponse {
        record,
        status: "success",
    }))
}

// GET /api/ask/stream?prompt=
pub async fn ask_stream(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<AskParams>,
) -> Response {
    let question = params.question();
    let (emitter, receiver) = EventEmitter::channel();
    let cancel = CancellationToken::new();

    let orchestrator = state.orchestrator().clone();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator
            .ask_stream(&question, caller.user_id(), &emitter, &task_cancel)
            .await
        {
            debug!(error = %e, "streamed request ended with an error event");
        }
    });

    let sse = Sse::new(event_stream(receiver, cancel)).keep_alive(KeepAlive::default());

    let mut response = sse.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

/// Turns orchestrator events into SSE frames.
///
/// The stream owns a drop guard on `cancel`: when axum drops the body because
/// the client went away, the orchestrator and its upstream call are stopped.
fn event_stream(
    receiver: EventReceiver,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let disconnect = cancel.drop_guard();
    receiver.into_stream().filter_map(move |event| {
        let _held = &disconnect;
        let frame = match event.to_sse() {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                warn!(error = %e, "failed to encode stream event");
                None
            }
        };
        future::ready(frame)
    })
}

// GET /api/records
pub async fn list_records(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<QaRecord>>, ServiceError> {
    let records = state.orchestrator().store().list_records().await?;
    Ok(ApiResponse::ok("records retrieved", records))
}

// GET /api/records/{id}
pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(record_id) = id.parse::<RecordId>() else {
        return ErrorBody::new("invalid record id").with_status(StatusCode::BAD_REQUEST);
    };

    match state.orchestrator().store().get_record(record_id).await {
        Ok(record) => ApiResponse::ok("record retrieved", record).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

// GET /api/user/records
pub async fn user_records(State(state): State<AppState>, caller: CallerIdentity) -> Response {
    let Some(user_id) = caller.user_id() else {
        return ErrorBody::new("authentication required").with_status(StatusCode::UNAUTHORIZED);
    };

    match state
        .orchestrator()
        .store()
        .list_records_for_user(user_id)
        .await
    {
        Ok(records) => ApiResponse::ok("user records retrieved", records).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}
