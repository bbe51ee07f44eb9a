use crate::capability::{Answerer, ChatCompletionsClient, SpeechClient, Synthesizer, Transcriber};
use crate::config::Config;
use crate::pipeline::QueryOrchestrator;
use crate::session::{SessionFinalizer, SessionMemory};
use crate::store::{FsObjectStore, FsSessionStore, ObjectStore, SessionStore};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// External collaborators the core talks to through narrow interfaces
#[derive(Clone)]
pub struct Collaborators {
    pub objects: Arc<dyn ObjectStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub transcriber: Arc<dyn Transcriber>,
    pub answerer: Arc<dyn Answerer>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl Collaborators {
    /// Filesystem stores plus the OpenAI-compatible HTTP capabilities from `config`
    pub fn from_config(config: &Config) -> Self {
        let chat = Arc::new(ChatCompletionsClient::from_config(
            &config.capabilities,
            &config.pipeline,
        ));
        Self {
            objects: Arc::new(FsObjectStore::new(&config.storage.audio_root)),
            sessions: Arc::new(FsSessionStore::new(&config.storage.sessions_root)),
            transcriber: chat.clone(),
            answerer: chat,
            synthesizer: Arc::new(SpeechClient::from_config(
                &config.capabilities,
                &config.pipeline,
            )),
        }
    }
}

/// The orchestrator, finalizer and the session memory they share
#[derive(Clone)]
pub struct Service {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub finalizer: Arc<SessionFinalizer>,
    pub memory: Arc<SessionMemory>,
    config: Arc<Config>,
}

impl Service {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let memory = Arc::new(SessionMemory::new(config.memory.idle_ttl()));
        let orchestrator = Arc::new(QueryOrchestrator::new(
            &collaborators,
            Arc::clone(&memory),
            config.pipeline.clone(),
        ));
        let finalizer = Arc::new(SessionFinalizer::new(
            Arc::clone(&memory),
            Arc::clone(&collaborators.objects),
            Arc::clone(&collaborators.sessions),
            config.finalize.clone(),
        ));

        Self {
            orchestrator,
            finalizer,
            memory,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start evicting idle sessions in the background
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        Arc::clone(&self.memory).spawn_sweeper(self.config.memory.sweep_interval())
    }
}
