pub mod capability;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod request;
pub mod service;
pub mod session;
pub mod store;

pub use capability::{
    Answerer, AudioCodec, ChatCompletionsClient, QueryAudio, SpeechClient, SynthesizedAudio,
    Synthesizer, Transcriber,
};
pub use config::{CapabilitiesConfig, Config, PipelineConfig};
pub use error::{AgentError, Capability, CapabilityError, Result, StoreError};
pub use http::{create_router, AppState};
pub use pipeline::{Event, PipelineOutcome, PipelineState, QueryOrchestrator};
pub use request::{FinalizeRequest, QueryRequest, Request};
pub use service::{Collaborators, Service};
pub use session::{
    FinalizeSummary, HistoryMessage, PersistedConversation, SessionFinalizer, SessionKey,
    SessionMemory, Turn,
};
pub use store::{
    FsObjectStore, FsSessionStore, MemoryObjectStore, MemorySessionStore, ObjectStore,
    SessionStore,
};
