//! Session lifecycle
//!
//! This module owns everything that happens to a session between queries:
//! - Turn / PersistedConversation model
//! - In-process session memory with per-session serialization and idle eviction
//! - History projection from the persisted store
//! - Finalization into the session store

mod finalizer;
mod history;
mod memory;
mod turn;

pub use finalizer::{FinalizeSummary, SessionFinalizer};
pub use history::{project, HistoryMessage, HistoryViewBuilder, Role};
pub use memory::SessionMemory;
pub use turn::{
    response_audio_key, PersistedConversation, PersistedTurn, SessionKey, Turn, TurnDraft,
};
