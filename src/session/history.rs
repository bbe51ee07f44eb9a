//! Projects a persisted conversation into the context window fed to the answering capability.

use super::turn::{PersistedConversation, SessionKey};
use crate::store::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat message of conversational context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    #[serde(rename = "content")]
    pub text: String,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Last `limit` turns, oldest first, as user/assistant message pairs.
///
/// A missing record is a cold start and yields no messages.
pub fn project(conversation: Option<&PersistedConversation>, limit: usize) -> Vec<HistoryMessage> {
    let Some(conversation) = conversation else {
        return Vec::new();
    };

    let turns = &conversation.conversation;
    let start = turns.len().saturating_sub(limit);
    turns[start..]
        .iter()
        .flat_map(|turn| {
            [
                HistoryMessage::user(&turn.query_text),
                HistoryMessage::assistant(&turn.answer_text),
            ]
        })
        .collect()
}

/// Loads history for a query from the persisted session store.
///
/// Turns still held in session memory are not consulted. A live session's own
/// unsaved turns only become context after it is finalized.
#[derive(Clone)]
pub struct HistoryViewBuilder {
    store: Arc<dyn SessionStore>,
    limit: usize,
    timeout: Duration,
}

impl HistoryViewBuilder {
    pub fn new(store: Arc<dyn SessionStore>, limit: usize, timeout: Duration) -> Self {
        Self {
            store,
            limit,
            timeout,
        }
    }

    /// Store failures degrade to an empty history rather than failing the query.
    pub async fn build(&self, key: &SessionKey) -> Vec<HistoryMessage> {
        let record = match tokio::time::timeout(self.timeout, self.store.get(key)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                error!("Failed to load history for {}: {}", key, e);
                return Vec::new();
            }
            Err(_) => {
                error!(
                    "Loading history for {} timed out after {:?}",
                    key, self.timeout
                );
                return Vec::new();
            }
        };

        if record.is_none() {
            info!("No existing conversation history for {}", key);
        }

        let messages = project(record.as_ref(), self.limit);
        info!("Loaded {} history messages for {}", messages.len(), key);
        messages
    }
}
