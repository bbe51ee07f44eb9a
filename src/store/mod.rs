//! Storage collaborators: the audio object store and the session store.
//!
//! Implementations:
//! - Memory: `RwLock<HashMap>` backed, for tests and local development
//! - Filesystem: objects and session records under a root directory

mod fs;
mod memory;

pub use fs::{FsObjectStore, FsSessionStore};
pub use memory::{MemoryObjectStore, MemorySessionStore};

use crate::error::StoreError;
use crate::session::{PersistedConversation, SessionKey};

/// Content-keyed blob storage for query and response audio
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the bytes stored under `key`, or `StoreError::NotFound`
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError>;
}

/// Persisted conversation records keyed by session + lecture
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `Ok(None)` if the session was never finalized
    async fn get(&self, key: &SessionKey) -> Result<Option<PersistedConversation>, StoreError>;

    /// Fully replace any existing record for the same key
    async fn upsert(&self, record: &PersistedConversation) -> Result<(), StoreError>;
}
