// Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use lecture_qa::config::Config;
use lecture_qa::session::HistoryMessage;
use lecture_qa::{
    Answerer, AudioCodec, CapabilityError, Collaborators, Event, MemoryObjectStore,
    MemorySessionStore, ObjectStore, PersistedConversation, QueryAudio, QueryRequest,
    SessionKey, SessionStore, StoreError, SynthesizedAudio, Synthesizer, Transcriber,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const QUERY_KEY: &str = "queries/s1/q1.webm";

pub fn unavailable() -> CapabilityError {
    CapabilityError::Status {
        status: 503,
        body: "model overloaded".to_string(),
    }
}

/// Deterministic, non-repeating-at-chunk-boundaries payload
pub fn audio_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub struct FakeTranscriber {
    pub text: Option<String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::returning(text)
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &QueryAudio) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.text.clone().ok_or_else(unavailable)
    }
}

pub struct FakeAnswerer {
    pub answer: Option<String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub histories: Mutex<Vec<Vec<HistoryMessage>>>,
}

impl FakeAnswerer {
    pub fn returning(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            ..Self::returning("")
        }
    }

    pub fn slow(answer: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::returning(answer)
        }
    }

    pub fn seen_histories(&self) -> Vec<Vec<HistoryMessage>> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl Answerer for FakeAnswerer {
    async fn answer(
        &self,
        _lecture_id: &str,
        _question: &str,
        history: &[HistoryMessage],
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(history.to_vec());
        tokio::time::sleep(self.delay).await;
        self.answer.clone().ok_or_else(unavailable)
    }
}

pub struct FakeSynthesizer {
    pub audio_len: Option<usize>,
    pub calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn returning(audio_len: usize) -> Self {
        Self {
            audio_len: Some(audio_len),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            audio_len: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audio_len
            .map(|len| SynthesizedAudio::new(audio_bytes(len), AudioCodec::Mp3))
            .ok_or_else(unavailable)
    }
}

/// Object store whose writes always fail
pub struct ReadOnlyObjectStore {
    pub inner: MemoryObjectStore,
}

#[async_trait]
impl ObjectStore for ReadOnlyObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, _key: &str, _bytes: &[u8], _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("bucket is read-only".to_string()))
    }
}

/// Object store whose reads always fail
pub struct UnreadableObjectStore;

#[async_trait]
impl ObjectStore for UnreadableObjectStore {
    async fn get(&self, _key: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Unavailable("connection reset".to_string()))
    }

    async fn put(&self, _key: &str, _bytes: &[u8], _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection reset".to_string()))
    }
}

/// Object store that answers reads only after `delay`
pub struct SlowObjectStore {
    pub inner: MemoryObjectStore,
    pub delay: Duration,
}

#[async_trait]
impl ObjectStore for SlowObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        self.inner.put(key, bytes, content_type).await
    }
}

/// Session store whose reads always fail
pub struct BrokenSessionStore;

#[async_trait]
impl SessionStore for BrokenSessionStore {
    async fn get(&self, _key: &SessionKey) -> Result<Option<PersistedConversation>, StoreError> {
        Err(StoreError::Unavailable("table offline".to_string()))
    }

    async fn upsert(&self, _record: &PersistedConversation) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("table offline".to_string()))
    }
}

/// Everything a test needs to drive the service with fakes
pub struct Harness {
    pub objects: Arc<MemoryObjectStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub transcriber: Arc<FakeTranscriber>,
    pub answerer: Arc<FakeAnswerer>,
    pub synthesizer: Arc<FakeSynthesizer>,
}

impl Harness {
    /// "hello" → "hi there" → 10000 bytes of speech
    pub async fn new() -> Self {
        Self::with(
            FakeTranscriber::returning("hello"),
            FakeAnswerer::returning("hi there"),
            FakeSynthesizer::returning(10_000),
        )
        .await
    }

    pub async fn with(
        transcriber: FakeTranscriber,
        answerer: FakeAnswerer,
        synthesizer: FakeSynthesizer,
    ) -> Self {
        let objects = Arc::new(MemoryObjectStore::new());
        objects.insert(QUERY_KEY, vec![7u8; 512], "audio/webm").await;

        Self {
            objects,
            sessions: Arc::new(MemorySessionStore::new()),
            transcriber: Arc::new(transcriber),
            answerer: Arc::new(answerer),
            synthesizer: Arc::new(synthesizer),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            objects: self.objects.clone(),
            sessions: self.sessions.clone(),
            transcriber: self.transcriber.clone(),
            answerer: self.answerer.clone(),
            synthesizer: self.synthesizer.clone(),
        }
    }
}

pub fn query(session_id: &str, lecture_id: &str, audio_ref: &str) -> QueryRequest {
    QueryRequest {
        session_id: session_id.to_string(),
        lecture_id: lecture_id.to_string(),
        query_audio_ref: audio_ref.to_string(),
        connection_id: None,
    }
}

pub fn test_config() -> Config {
    Config::default()
}

/// Drain an event receiver until the pipeline closes it
pub async fn collect(mut events: mpsc::Receiver<Event>) -> Vec<Event> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}
