//! Events sent to a client during a streamed answer.

use crate::storage::{RecordId, UserId};
use axum::response::sse::Event;
use serde::{Deserialize, Serialize};

/// One event of a streamed answer, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// The question was accepted and stored
    Start {
        /// Identity of the stored record
        record_id: RecordId,
        /// The question, echoed back
        question: String,
        /// Caller identity, `null` when anonymous
        user_id: Option<UserId>,
    },
    /// The next piece of the answer
    Delta {
        /// Incremental text only
        content: String,
    },
    /// The answer is complete and stored
    End {
        /// Identity of the stored record
        record_id: RecordId,
        /// The full answer
        answer: String,
    },
    /// The request failed; no further events follow
    Error {
        /// Caller-safe description
        error: String,
    },
}

impl StreamEvent {
    /// Creates a start event.
    #[must_use]
    pub fn start(record_id: RecordId, question: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self::Start {
            record_id,
            question: question.into(),
            user_id,
        }
    }

    /// Creates a delta event.
    #[must_use]
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Delta {
            content: content.into(),
        }
    }

    /// Creates an end event.
    #[must_use]
    pub fn end(record_id: RecordId, answer: impl Into<String>) -> Self {
        Self::End {
            record_id,
            answer: answer.into(),
        }
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// True for `end` and `error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. } | Self::Error { .. })
    }

    /// Renders the event as one server-sent event with a JSON `data` field.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization fails.
    pub fn to_sse(&self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}
