//! Server-sent-events decoding for streamed chat completions.
//!
//! The decoder runs on its own task, reads the upstream body line by line and
//! hands parsed [`StreamFragment`]s to the consumer over a bounded channel.
//! Transport failures travel on a second, single-slot channel. Both channels
//! are owned by a [`FragmentSink`], which is consumed by the decode loop, so
//! every exit path closes both outlets exactly once.

use crate::llm::error::LLMError;
use crate::llm::types::StreamFragment;
use futures::{Stream, StreamExt};
use std::fmt;
use std::ops::ControlFlow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Capacity of the fragment hand-off channel.
pub const FRAGMENT_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the error hand-off channel.
pub const ERROR_CHANNEL_CAPACITY: usize = 1;

/// Longest line the decoder will buffer before giving up on the body.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Producer half of a fragment stream.
#[derive(Debug)]
pub struct FragmentSink {
    fragments: mpsc::Sender<StreamFragment>,
    errors: mpsc::Sender<LLMError>,
}

/// Consumer half of a fragment stream.
///
/// `fragments` closes when the upstream sequence ends for any reason. A
/// transport failure is delivered on `errors` before it closes.
#[derive(Debug)]
pub struct FragmentStream {
    /// Parsed fragments in arrival order
    pub fragments: mpsc::Receiver<StreamFragment>,
    /// At most one terminal upstream error
    pub errors: mpsc::Receiver<LLMError>,
}

/// Creates a connected sink/stream pair.
#[must_use]
pub fn fragment_channel() -> (FragmentSink, FragmentStream) {
    let (fragments_tx, fragments_rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
    let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
    (
        FragmentSink {
            fragments: fragments_tx,
            errors: errors_tx,
        },
        FragmentStream {
            fragments: fragments_rx,
            errors: errors_rx,
        },
    )
}

/// Classification of one line of an event-stream body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Keep-alive, comment or a field this decoder ignores
    Skip,
    /// The end-of-stream sentinel
    Done,
    /// A parsed fragment
    Fragment(StreamFragment),
    /// A `data:` payload that did not parse
    Malformed(LLMError),
}

/// Classifies a single line (without its terminator).
#[must_use]
pub fn parse_line(line: &str) -> SseLine {
    if line.trim().is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        debug!(line = %line, "ignoring non-data event field");
        return SseLine::Skip;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim_end() == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamFragment>(payload) {
        Ok(fragment) => SseLine::Fragment(fragment),
        Err(e) => SseLine::Malformed(LLMError::malformed_frame(e.to_string())),
    }
}

impl FragmentSink {
    /// Delivers a terminal error and closes both outlets.
    pub async fn fail(self, error: LLMError) {
        // The consumer may already be gone.
        let _ = self.errors.send(error).await;
    }

    /// Decodes an event-stream body until the sentinel, end of body, a read
    /// error, or cancellation.
    pub async fn decode<S, B, E>(self, body: S, cancel: &CancellationToken)
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let mut body = std::pin::pin!(body);
        let mut buffer = LineBuffer::default();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("stream decode cancelled");
                    return;
                }
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    buffer.extend(chunk.as_ref());
                    while let Some(line) = buffer.next_line() {
                        if self.handle_line(&line, cancel).await.is_break() {
                            return;
                        }
                    }
                    if buffer.pending() > MAX_LINE_BYTES {
                        self.fail(LLMError::stream_error(format!(
                            "event line exceeds {} bytes",
                            MAX_LINE_BYTES
                        )))
                        .await;
                        return;
                    }
                }
                Some(Err(e)) => {
                    self.fail(LLMError::stream_error(format!(
                        "failed to read response body: {}",
                        e
                    )))
                    .await;
                    return;
                }
                None => {
                    if let Some(line) = buffer.finish() {
                        let _ = self.handle_line(&line, cancel).await;
                    }
                    trace!("upstream body ended");
                    return;
                }
            }
        }
    }

    async fn handle_line(&self, line: &[u8], cancel: &CancellationToken) -> ControlFlow<()> {
        let Ok(line) = std::str::from_utf8(line) else {
            warn!("dropping stream line that is not valid UTF-8");
            return ControlFlow::Continue(());
        };

        match parse_line(line) {
            SseLine::Skip => ControlFlow::Continue(()),
            SseLine::Done => {
                trace!("received end-of-stream sentinel");
                ControlFlow::Break(())
            }
            SseLine::Malformed(error) => {
                warn!(error = %error, "dropping malformed stream frame");
                ControlFlow::Continue(())
            }
            SseLine::Fragment(fragment) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => ControlFlow::Break(()),
                    sent = self.fragments.send(fragment) => match sent {
                        Ok(()) => ControlFlow::Continue(()),
                        Err(_) => ControlFlow::Break(()),
                    },
                }
            }
        }
    }
}

impl FragmentStream {
    /// Reads the whole sequence, returning every fragment and the terminal
    /// error if one was reported.
    pub async fn collect(mut self) -> (Vec<StreamFragment>, Option<LLMError>) {
        let mut fragments = Vec::new();
        while let Some(fragment) = self.fragments.recv().await {
            fragments.push(fragment);
        }
        let error = self.errors.recv().await;
        (fragments, error)
    }
}

/// Byte buffer that yields complete lines across arbitrary chunk boundaries.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn pending(&self) -> usize {
        self.bytes.len()
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.bytes.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn finish(&mut self) -> Option<Vec<u8>> {
        if self.bytes.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.bytes);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }
}
