//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use qa_stream::llm::types::{ChatCompletionRequest, ChatCompletionResponse};
use qa_stream::llm::{
    fragment_channel, ChatProvider, FragmentStream, LLMError, Provider, ProviderClient,
    ProviderConfig, ProviderHandle,
};
use qa_stream::qa::QueryOrchestrator;
use qa_stream::storage::{MemoryStore, QaRecord, QaStore, RecordId, StorageError, UserId};
use std::io;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One body chunk delivered by the scripted upstream.
#[derive(Debug, Clone)]
pub enum Chunk {
    Bytes(String),
    ReadError(String),
}

/// A fragment line in OpenAI chat-completions shape.
pub fn frame(content: &str) -> String {
    let fragment = serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}}],
    });
    format!("data: {}\n\n", fragment)
}

pub const DONE: &str = "data: [DONE]\n\n";

/// Streaming provider that replays a fixed event-stream body through the
/// real decoder.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    chunks: Vec<Chunk>,
    hang: bool,
    ask_result: Result<String, LLMError>,
    seen_cancel: Arc<Mutex<Option<CancellationToken>>>,
    watched: Option<Arc<MemoryStore>>,
    records_at_call: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedProvider {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            hang: false,
            ask_result: Ok("scripted answer".to_string()),
            seen_cancel: Arc::new(Mutex::new(None)),
            watched: None,
            records_at_call: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_text(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| Chunk::Bytes((*c).to_string())).collect())
    }

    /// Keeps the body open after the scripted chunks instead of ending it.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn failing_ask(mut self, error: LLMError) -> Self {
        self.ask_result = Err(error);
        self
    }

    /// Counts the records in `store` each time the provider is called.
    pub fn watching(mut self, store: Arc<MemoryStore>) -> Self {
        self.watched = Some(store);
        self
    }

    /// Record counts seen by each provider call, in call order.
    pub fn records_at_call(&self) -> Vec<usize> {
        self.records_at_call.lock().unwrap().clone()
    }

    async fn note_call(watched: Option<&MemoryStore>, seen: &Mutex<Vec<usize>>) {
        if let Some(store) = watched {
            let count = store.len().await;
            seen.lock().unwrap().push(count);
        }
    }

    /// The cancellation token handed to the last streamed request.
    pub fn upstream_token(&self) -> Option<CancellationToken> {
        self.seen_cancel.lock().unwrap().clone()
    }

    pub fn client(self) -> ProviderClient {
        ProviderClient::with_handle(
            ProviderConfig::new("openai"),
            ProviderHandle::Streaming(Arc::new(self)),
        )
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn ask(&self, _question: &str) -> Result<String, LLMError> {
        Self::note_call(self.watched.as_deref(), &self.records_at_call).await;
        self.ask_result.clone()
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    async fn check_connection(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_completion(
        &self,
        _request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LLMError> {
        Err(LLMError::invalid_request("not scripted"))
    }

    fn chat_completion_stream(
        &self,
        _request: ChatCompletionRequest,
        cancel: CancellationToken,
    ) -> FragmentStream {
        *self.seen_cancel.lock().unwrap() = Some(cancel.clone());

        let (sink, fragments) = fragment_channel();
        let items: Vec<Result<Vec<u8>, io::Error>> = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                Chunk::Bytes(text) => Ok(text.clone().into_bytes()),
                Chunk::ReadError(reason) => Err(io::Error::other(reason.clone())),
            })
            .collect();
        let hang = self.hang;
        let watched = self.watched.clone();
        let records_at_call = self.records_at_call.clone();

        tokio::spawn(async move {
            Self::note_call(watched.as_deref(), &records_at_call).await;
            let body = stream::iter(items);
            if hang {
                sink.decode(body.chain(stream::pending()), &cancel).await;
            } else {
                sink.decode(body, &cancel).await;
            }
        });

        fragments
    }
}

/// Store whose placeholder inserts or answer writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_placeholder: bool,
}

impl FailingStore {
    /// Accepts questions but fails every answer write.
    pub fn answers() -> Self {
        Self::default()
    }

    /// Fails every placeholder insert.
    pub fn placeholders() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_placeholder: true,
        }
    }
}

#[async_trait]
impl QaStore for FailingStore {
    async fn create_placeholder(
        &self,
        question: &str,
        user_id: Option<UserId>,
    ) -> Result<RecordId, StorageError> {
        if self.fail_placeholder {
            return Err(
                StorageError::query_failed("create_placeholder", "database is locked")
                    .during_write(),
            );
        }
        self.inner.create_placeholder(question, user_id).await
    }

    async fn set_answer(&self, record_id: RecordId, _answer: &str) -> Result<(), StorageError> {
        Err(StorageError::query_failed("set_answer", "disk I/O error")
            .for_record(record_id)
            .during_write())
    }

    async fn get_record(&self, record_id: RecordId) -> Result<QaRecord, StorageError> {
        self.inner.get_record(record_id).await
    }

    async fn list_records(&self) -> Result<Vec<QaRecord>, StorageError> {
        self.inner.list_records().await
    }

    async fn list_records_for_user(&self, user_id: UserId) -> Result<Vec<QaRecord>, StorageError> {
        self.inner.list_records_for_user(user_id).await
    }
}

pub fn orchestrator(client: ProviderClient) -> (QueryOrchestrator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (QueryOrchestrator::new(store.clone(), Arc::new(client)), store)
}
