//! Query orchestrator: fetch → transcribe → answer → synthesize → stream.
//!
//! Each stage depends on the previous one's output, so stages run strictly in
//! sequence. Every remote call is bounded by a timeout and raced against the
//! consumer going away; a stage failure becomes exactly one terminal `Error`
//! event and nothing is written to session memory.

use super::chunk::{chunk_audio, chunk_count};
use super::event::Event;
use super::state::PipelineState;
use crate::capability::{Answerer, QueryAudio, Synthesizer, Transcriber};
use crate::config::PipelineConfig;
use crate::error::{AgentError, Capability, CapabilityError, StoreError};
use crate::request::QueryRequest;
use crate::service::Collaborators;
use crate::session::{HistoryViewBuilder, SessionMemory, TurnDraft};
use crate::store::ObjectStore;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How one pipeline invocation ended
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every event was delivered and the turn was recorded
    Completed { turn_number: u32 },
    /// A stage failed; the consumer received one `Error` event
    Failed {
        state: PipelineState,
        error: AgentError,
    },
    /// The consumer disconnected; no further remote calls were issued
    Cancelled { state: PipelineState },
}

enum Interrupt {
    Failed(AgentError),
    Cancelled,
}

impl From<AgentError> for Interrupt {
    fn from(error: AgentError) -> Self {
        Interrupt::Failed(error)
    }
}

/// Per-invocation state: the current stage and the consumer's channel
struct PipelineRun {
    state: PipelineState,
    events: mpsc::Sender<Event>,
}

impl PipelineRun {
    /// Move to the next stage unless the consumer already left
    fn enter(&mut self, state: PipelineState) -> Result<(), Interrupt> {
        if self.events.is_closed() {
            return Err(Interrupt::Cancelled);
        }
        debug!("Pipeline {} -> {}", self.state, state);
        self.state = state;
        Ok(())
    }

    async fn emit(&self, event: Event) -> Result<(), Interrupt> {
        self.events
            .send(event)
            .await
            .map_err(|_| Interrupt::Cancelled)
    }

    /// Await a remote call bounded by `limit`. `Ok(None)` means it timed out.
    async fn remote<F: Future>(
        &self,
        limit: Duration,
        call: F,
    ) -> Result<Option<F::Output>, Interrupt> {
        tokio::select! {
            _ = self.events.closed() => Err(Interrupt::Cancelled),
            outcome = tokio::time::timeout(limit, call) => Ok(outcome.ok()),
        }
    }
}

pub struct QueryOrchestrator {
    objects: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    answerer: Arc<dyn Answerer>,
    synthesizer: Arc<dyn Synthesizer>,
    history: HistoryViewBuilder,
    memory: Arc<SessionMemory>,
    config: PipelineConfig,
}

impl QueryOrchestrator {
    pub fn new(
        collaborators: &Collaborators,
        memory: Arc<SessionMemory>,
        config: PipelineConfig,
    ) -> Self {
        let history = HistoryViewBuilder::new(
            Arc::clone(&collaborators.sessions),
            config.history_limit,
            config.history_timeout(),
        );

        Self {
            objects: Arc::clone(&collaborators.objects),
            transcriber: Arc::clone(&collaborators.transcriber),
            answerer: Arc::clone(&collaborators.answerer),
            synthesizer: Arc::clone(&collaborators.synthesizer),
            history,
            memory,
            config,
        }
    }

    /// Start a query in the background and return its event stream.
    ///
    /// The receiver is bounded; dropping it cancels the pipeline.
    pub fn execute(self: &Arc<Self>, request: QueryRequest) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let orchestrator = Arc::clone(self);
        let span = info_span!(
            "query",
            request_id = %uuid::Uuid::new_v4(),
            session_id = %request.session_id,
            lecture_id = %request.lecture_id,
            connection_id = request.connection_id.as_deref().unwrap_or("-"),
        );

        tokio::spawn(
            async move {
                orchestrator.run(&request, tx).await;
            }
            .instrument(span),
        );

        rx
    }

    /// Drive one query to completion, pushing events into `events`.
    pub async fn run(&self, request: &QueryRequest, events: mpsc::Sender<Event>) -> PipelineOutcome {
        let mut run = PipelineRun {
            state: PipelineState::Fetching,
            events,
        };
        info!("Processing query {}", request.query_audio_ref);

        match self.drive(request, &mut run).await {
            Ok(turn_number) => PipelineOutcome::Completed { turn_number },
            Err(Interrupt::Cancelled) => {
                warn!("Consumer disconnected while {}, abandoning query", run.state);
                PipelineOutcome::Cancelled { state: run.state }
            }
            Err(Interrupt::Failed(error)) => {
                let state = run.state;
                error!("Query failed while {}: {}", state, error);
                run.state = PipelineState::Failed;
                if run.emit(Event::Error(error.to_string())).await.is_err() {
                    debug!("Consumer gone before error event could be delivered");
                }
                PipelineOutcome::Failed { state, error }
            }
        }
    }

    async fn drive(&self, request: &QueryRequest, run: &mut PipelineRun) -> Result<u32, Interrupt> {
        run.enter(PipelineState::Fetching)?;
        let audio = self.fetch(request, run).await?;

        run.enter(PipelineState::Transcribing)?;
        let limit = self.config.transcribe_timeout();
        let outcome = run.remote(limit, self.transcriber.transcribe(&audio)).await?;
        let transcript = capability_result(Capability::Transcription, limit, outcome)?;
        info!("Query transcribed: {} chars", transcript.len());
        run.emit(Event::QueryText(transcript.clone())).await?;

        run.enter(PipelineState::Answering)?;
        let history = self.history.build(&request.session_key()).await;
        let limit = self.config.answer_timeout();
        let outcome = run
            .remote(
                limit,
                self.answerer
                    .answer(&request.lecture_id, &transcript, &history),
            )
            .await?;
        let answer = capability_result(Capability::Answering, limit, outcome)?;
        info!("Answer generated: {} chars", answer.len());
        run.emit(Event::AnswerText(answer.clone())).await?;

        run.enter(PipelineState::Synthesizing)?;
        let limit = self.config.synthesize_timeout();
        let outcome = run.remote(limit, self.synthesizer.synthesize(&answer)).await?;
        let speech = capability_result(Capability::Synthesis, limit, outcome)?;
        info!("Speech synthesized: {} bytes", speech.bytes.len());

        run.enter(PipelineState::Streaming)?;
        for (index, chunk) in chunk_audio(&speech.bytes, self.config.chunk_size) {
            run.emit(Event::AudioChunk {
                index,
                data: chunk.to_vec(),
            })
            .await?;
        }
        run.emit(Event::AudioComplete).await?;
        info!(
            "Streamed {} audio chunks",
            chunk_count(speech.bytes.len(), self.config.chunk_size)
        );

        run.state = PipelineState::Done;
        let turn_number = self
            .memory
            .append(
                &request.session_key(),
                TurnDraft {
                    query_audio_ref: request.query_audio_ref.clone(),
                    query_text: transcript,
                    answer_text: answer,
                    response_audio: speech,
                    timestamp: Utc::now(),
                },
            )
            .await;
        info!("Stored turn {} in session memory", turn_number);

        Ok(turn_number)
    }

    async fn fetch(&self, request: &QueryRequest, run: &PipelineRun) -> Result<QueryAudio, Interrupt> {
        let key = &request.query_audio_ref;
        let limit = self.config.fetch_timeout();

        match run.remote(limit, self.objects.get(key)).await? {
            Some(Ok(bytes)) => {
                info!("Fetched query audio {} ({} bytes)", key, bytes.len());
                Ok(QueryAudio::new(key.clone(), bytes))
            }
            Some(Err(e)) => {
                match &e {
                    StoreError::NotFound { .. } | StoreError::InvalidKey { .. } => {
                        warn!("Query audio {} is missing: {}", key, e)
                    }
                    _ => error!("Failed to read query audio {}: {}", key, e),
                }
                Err(AgentError::ObjectNotFound { key: key.clone() }.into())
            }
            None => {
                error!(
                    "Reading query audio {} timed out after {}s",
                    key,
                    limit.as_secs()
                );
                Err(AgentError::ObjectNotFound { key: key.clone() }.into())
            }
        }
    }
}

fn capability_result<T>(
    capability: Capability,
    limit: Duration,
    outcome: Option<Result<T, CapabilityError>>,
) -> Result<T, AgentError> {
    match outcome {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(AgentError::unavailable(capability, e.to_string())),
        None => Err(AgentError::unavailable(
            capability,
            format!("timed out after {}s", limit.as_secs()),
        )),
    }
}
