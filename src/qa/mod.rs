//! Question answering: the request state machine and its outbound events.
//!
//! [`QueryOrchestrator`] owns the lifecycle of each question. Streamed
//! answers are pushed to the request surface through an [`EventEmitter`],
//! whose receiving half the HTTP layer turns into server-sent events.

mod emitter;
mod events;
mod orchestrator;

pub use emitter::{EmitterClosed, EventEmitter, EventReceiver, EVENT_CHANNEL_CAPACITY};
pub use events::StreamEvent;
pub use orchestrator::{
    AnswerRecord, QueryOrchestrator, QueryState, StreamOutcome, STREAM_ERROR_ANSWER,
    UNAVAILABLE_ANSWER,
};
