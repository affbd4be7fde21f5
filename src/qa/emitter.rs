//! Outbound event emitter.
//!
//! The orchestrator pushes events into an [`EventEmitter`]; the HTTP layer
//! drains the paired [`EventReceiver`] and writes each event to the open
//! connection as its own server-sent event, flushed as soon as it is
//! produced.

use crate::qa::events::StreamEvent;
use std::fmt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Events the emitter will hold before `emit` waits on the consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// The downstream consumer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterClosed;

impl fmt::Display for EmitterClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event consumer disconnected")
    }
}

impl std::error::Error for EmitterClosed {}

/// Producer side of a client event stream.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<StreamEvent>,
}

/// Consumer side of a client event stream.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventEmitter {
    /// Creates a connected emitter/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, EventReceiver { rx })
    }

    /// Hands one event to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterClosed`] once the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> Result<(), EmitterClosed> {
        self.tx.send(event).await.map_err(|_| EmitterClosed)
    }
}

impl EventReceiver {
    /// Receives the next event, or `None` when every emitter is dropped.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Reads events until the emitter side closes.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    /// Adapts the receiver into a `Stream` of events.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<StreamEvent> {
        ReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordId;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (emitter, receiver) = EventEmitter::channel();
        emitter.emit(StreamEvent::delta("a")).await.unwrap();
        emitter.emit(StreamEvent::delta("b")).await.unwrap();
        emitter.emit(StreamEvent::end(RecordId::new(1), "ab")).await.unwrap();
        drop(emitter);

        let events = receiver.collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::delta("a"),
                StreamEvent::delta("b"),
                StreamEvent::end(RecordId::new(1), "ab"),
            ]
        );
    }

    #[tokio::test]
    async fn receiver_stream_ends_with_last_emitter() {
        let (emitter, receiver) = EventEmitter::channel();
        let second = emitter.clone();
        emitter.emit(StreamEvent::delta("a")).await.unwrap();
        second.emit(StreamEvent::delta("b")).await.unwrap();
        drop(emitter);
        drop(second);

        let events: Vec<StreamEvent> = receiver.into_stream().collect().await;
        assert_eq!(events, vec![StreamEvent::delta("a"), StreamEvent::delta("b")]);
    }

    #[tokio::test]
    async fn emit_fails_once_receiver_dropped() {
        let (emitter, receiver) = EventEmitter::channel();
        drop(receiver);

        assert_eq!(emitter.emit(StreamEvent::delta("x")).await, Err(EmitterClosed));
    }
}
