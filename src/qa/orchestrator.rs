//! Query orchestrator: drives one question from arrival to a stored answer.
//!
//! Both paths persist a placeholder record before the provider is contacted
//! and write the answer back exactly once. The streaming path relays each
//! fragment to the client as it arrives and stops the moment the client goes
//! away.

use crate::error::ServiceError;
use crate::llm::sse::FragmentStream;
use crate::llm::{LLMError, ProviderClient};
use crate::qa::emitter::EventEmitter;
use crate::qa::events::StreamEvent;
use crate::storage::{QaStore, RecordId, UserId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Answer stored when a single-shot request fails upstream.
pub const UNAVAILABLE_ANSWER: &str = "Sorry, the AI service is temporarily unavailable.";

/// Answer stored when a streamed request fails upstream.
pub const STREAM_ERROR_ANSWER: &str = "Sorry, the AI service encountered an error.";

/// Error event text for a mid-stream upstream failure.
const STREAM_ERROR_EVENT: &str = "AI service encountered an error";

/// Longest question prefix written to logs.
const QUESTION_EXCERPT_CHARS: usize = 64;

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryState {
    Created,
    Persisted,
    Answering,
    Streaming,
    Finalizing,
    Completed,
    Aborted,
}

impl QueryState {
    /// True for `Completed` and `Aborted`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Persisted => "persisted",
            Self::Answering => "answering",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of a successful single-shot request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    /// Identity of the stored record
    #[serde(rename = "id")]
    pub record_id: RecordId,
    /// The question as stored
    pub question: String,
    /// The stored answer
    pub answer: String,
    /// Caller identity, if any
    pub user_id: Option<UserId>,
}

/// How a streamed request ended without a request-scoped error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Identity of the stored record
    pub record_id: RecordId,
    /// `Completed`, or `Aborted` when the client went away
    pub state: QueryState,
    /// Text accumulated from the fragments relayed so far
    pub answer: String,
}

/// Per-request bookkeeping for a streamed answer.
#[derive(Debug)]
struct StreamSession {
    record_id: RecordId,
    state: QueryState,
    answer: String,
    fragments: usize,
}

impl StreamSession {
    fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            state: QueryState::Persisted,
            answer: String::new(),
            fragments: 0,
        }
    }

    fn transition(&mut self, next: QueryState) {
        trace!(record_id = %self.record_id, from = %self.state, to = %next, "query state change");
        self.state = next;
    }

    fn append(&mut self, content: &str) {
        self.fragments += 1;
        self.answer.push_str(content);
    }

    fn abandon(mut self) -> StreamOutcome {
        debug!(
            record_id = %self.record_id,
            fragments = self.fragments,
            "client disconnected; abandoning stream"
        );
        self.transition(QueryState::Aborted);
        self.into_outcome()
    }

    fn into_outcome(self) -> StreamOutcome {
        StreamOutcome {
            record_id: self.record_id,
            state: self.state,
            answer: self.answer,
        }
    }
}

fn excerpt(question: &str) -> String {
    question.chars().take(QUESTION_EXCERPT_CHARS).collect()
}

/// Drives requests through storage and the provider client.
///
/// Cheap to clone; every clone shares the same store and client.
#[derive(Debug, Clone)]
pub struct QueryOrchestrator {
    store: Arc<dyn QaStore>,
    client: Arc<ProviderClient>,
}

impl QueryOrchestrator {
    /// Creates an orchestrator over a shared store and provider client.
    #[must_use]
    pub fn new(store: Arc<dyn QaStore>, client: Arc<ProviderClient>) -> Self {
        Self { store, client }
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn QaStore> {
        &self.store
    }

    /// The shared provider client.
    #[must_use]
    pub fn client(&self) -> &Arc<ProviderClient> {
        &self.client
    }

    async fn persist_placeholder(
        &self,
        question: &str,
        caller: Option<UserId>,
    ) -> Result<RecordId, ServiceError> {
        self.store
            .create_placeholder(question, caller)
            .await
            .map_err(|e| {
                error!(question = %excerpt(question), error = %e, "failed to store question");
                ServiceError::storage(e)
            })
    }

    /// Answers `question` in one round trip.
    ///
    /// # Errors
    ///
    /// - bad request for an empty question, before anything is stored
    /// - storage error if the question or answer cannot be written
    /// - upstream error if the provider fails; the record then keeps
    ///   [`UNAVAILABLE_ANSWER`]
    pub async fn ask(
        &self,
        question: &str,
        caller: Option<UserId>,
    ) -> Result<AnswerRecord, ServiceError> {
        if question.trim().is_empty() {
            return Err(ServiceError::bad_request("missing prompt parameter"));
        }

        let record_id = self.persist_placeholder(question, caller).await?;
        trace!(record_id = %record_id, to = %QueryState::Answering, "query state change");

        let answer = match self.client.ask(question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(
                    record_id = %record_id,
                    question = %excerpt(question),
                    provider = self.client.provider_name(),
                    error = %e,
                    "provider failed to answer"
                );
                if let Err(store_err) = self.store.set_answer(record_id, UNAVAILABLE_ANSWER).await {
                    warn!(record_id = %record_id, error = %store_err, "failed to store error answer");
                }
                return Err(ServiceError::upstream(e));
            }
        };

        trace!(record_id = %record_id, to = %QueryState::Finalizing, "query state change");
        self.store
            .set_answer(record_id, &answer)
            .await
            .map_err(|e| {
                error!(record_id = %record_id, error = %e, "failed to store answer");
                ServiceError::storage(e)
            })?;

        info!(record_id = %record_id, answer_len = answer.len(), "question answered");

        Ok(AnswerRecord {
            record_id,
            question: question.to_string(),
            answer,
            user_id: caller,
        })
    }

    /// Answers `question` incrementally, pushing events through `emitter`.
    ///
    /// Every request-scoped failure is reported to the client as exactly one
    /// `error` event and returned. A disconnect, signalled through `cancel`
    /// or a closed emitter, is not an error: the outcome is `Aborted` and
    /// nothing further is stored or sent.
    ///
    /// # Errors
    ///
    /// - bad request for an empty question, before anything is stored
    /// - storage error if the question or final answer cannot be written
    /// - unsupported operation if the provider cannot stream; the record
    ///   keeps its empty answer
    /// - upstream error if the provider fails mid-stream; the record then
    ///   keeps [`STREAM_ERROR_ANSWER`]
    pub async fn ask_stream(
        &self,
        question: &str,
        caller: Option<UserId>,
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ServiceError> {
        if question.trim().is_empty() {
            let err = ServiceError::bad_request("missing prompt parameter");
            let _ = emitter.emit(StreamEvent::error(err.public_message())).await;
            return Err(err);
        }

        let record_id = match self.persist_placeholder(question, caller).await {
            Ok(record_id) => record_id,
            Err(err) => {
                let _ = emitter.emit(StreamEvent::error(err.public_message())).await;
                return Err(err);
            }
        };
        let mut session = StreamSession::new(record_id);

        if cancel.is_cancelled() {
            return Ok(session.abandon());
        }

        if !self.client.supports_streaming() {
            let err = ServiceError::unsupported(self.client.provider_name());
            warn!(record_id = %record_id, error = %err, "streaming requested from ask-only provider");
            let _ = emitter.emit(StreamEvent::error(err.public_message())).await;
            session.transition(QueryState::Aborted);
            return Err(err);
        }

        if emitter
            .emit(StreamEvent::start(record_id, question, caller))
            .await
            .is_err()
        {
            return Ok(session.abandon());
        }
        session.transition(QueryState::Streaming);

        // Stops the upstream task on every exit path, including early returns.
        let upstream = cancel.child_token();
        let _upstream_guard = upstream.clone().drop_guard();

        let stream = match self.client.stream_chat(question, upstream) {
            Ok(stream) => stream,
            Err(e) => return self.abort_stream(session, e, emitter).await,
        };

        match relay(&mut session, stream, emitter, cancel).await {
            Relay::Finished => {}
            Relay::Disconnected => return Ok(session.abandon()),
            Relay::Failed(e) => return self.abort_stream(session, e, emitter).await,
        }

        session.transition(QueryState::Finalizing);
        if let Err(e) = self.store.set_answer(record_id, &session.answer).await {
            error!(record_id = %record_id, error = %e, "failed to store streamed answer");
            let err = ServiceError::storage(e);
            let _ = emitter.emit(StreamEvent::error(err.public_message())).await;
            return Err(err);
        }

        // The answer is stored; a consumer that left now only misses `end`.
        let _ = emitter
            .emit(StreamEvent::end(record_id, session.answer.clone()))
            .await;
        session.transition(QueryState::Completed);

        info!(
            record_id = %record_id,
            fragments = session.fragments,
            answer_len = session.answer.len(),
            "streamed answer completed"
        );

        Ok(session.into_outcome())
    }

    async fn abort_stream(
        &self,
        mut session: StreamSession,
        cause: LLMError,
        emitter: &EventEmitter,
    ) -> Result<StreamOutcome, ServiceError> {
        error!(
            record_id = %session.record_id,
            provider = self.client.provider_name(),
            fragments = session.fragments,
            error = %cause,
            "upstream stream failed"
        );
        session.transition(QueryState::Aborted);

        if let Err(e) = self
            .store
            .set_answer(session.record_id, STREAM_ERROR_ANSWER)
            .await
        {
            warn!(record_id = %session.record_id, error = %e, "failed to store error answer");
        }

        let _ = emitter.emit(StreamEvent::error(STREAM_ERROR_EVENT)).await;
        Err(ServiceError::from(cause))
    }
}

/// How the relay loop ended.
enum Relay {
    Finished,
    Disconnected,
    Failed(LLMError),
}

/// Forwards fragments to the client until the upstream sequence ends.
///
/// The wait is biased: cancellation, then fragments, then errors. A fragment
/// decoded before an upstream failure is therefore always relayed first.
async fn relay(
    session: &mut StreamSession,
    stream: FragmentStream,
    emitter: &EventEmitter,
    cancel: &CancellationToken,
) -> Relay {
    let FragmentStream {
        mut fragments,
        mut errors,
    } = stream;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Relay::Disconnected,
            fragment = fragments.recv() => {
                let Some(fragment) = fragment else { break };
                let Some(content) = fragment.content_delta() else {
                    trace!(record_id = %session.record_id, "fragment without content");
                    continue;
                };
                session.append(content);
                if emitter.emit(StreamEvent::delta(content)).await.is_err() {
                    return Relay::Disconnected;
                }
            }
            Some(e) = errors.recv() => return Relay::Failed(e),
        }
    }

    // The fragment outlet closed; a pending transport error still wins.
    tokio::select! {
        biased;
        () = cancel.cancelled() => Relay::Disconnected,
        error = errors.recv() => match error {
            Some(e) => Relay::Failed(e),
            None => Relay::Finished,
        },
    }
}
