use super::memory::SessionMemory;
use super::turn::{response_audio_key, PersistedConversation, PersistedTurn, SessionKey, Turn};
use crate::config::FinalizeConfig;
use crate::error::{AgentError, Result};
use crate::store::{ObjectStore, SessionStore};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, Instrument};

/// Result of a successful finalize call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeSummary {
    pub turns_persisted: usize,
    pub session_id: String,
}

/// Drains session memory, uploads response audio and replaces the persisted record.
///
/// Not idempotent: finalizing twice with no queries in between persists an
/// empty conversation the second time, because the first call drained memory.
pub struct SessionFinalizer {
    memory: Arc<SessionMemory>,
    objects: Arc<dyn ObjectStore>,
    sessions: Arc<dyn SessionStore>,
    config: FinalizeConfig,
}

impl SessionFinalizer {
    pub fn new(
        memory: Arc<SessionMemory>,
        objects: Arc<dyn ObjectStore>,
        sessions: Arc<dyn SessionStore>,
        config: FinalizeConfig,
    ) -> Self {
        Self {
            memory,
            objects,
            sessions,
            config,
        }
    }

    pub async fn finalize(&self, key: &SessionKey) -> Result<FinalizeSummary> {
        let span = info_span!(
            "finalize",
            session_id = %key.session_id,
            lecture_id = %key.lecture_id
        );

        async {
            let turns = self.memory.drain(key).await;
            info!("Finalizing session {} with {} turns", key, turns.len());

            match self.persist(key, &turns).await {
                Ok(summary) => {
                    info!("Saved conversation for {}", key);
                    Ok(summary)
                }
                Err(e) => {
                    error!("Failed to finalize session {}: {}", key, e);
                    // Put the exchange back so a later finalize can retry
                    self.memory.restore(key, turns).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn persist(&self, key: &SessionKey, turns: &[Turn]) -> Result<FinalizeSummary> {
        let now = Utc::now();
        let expires_at = chrono::Duration::try_days(self.config.retention_days)
            .and_then(|retention| now.checked_add_signed(retention))
            .ok_or_else(|| {
                AgentError::persistence(format!(
                    "retention of {} days is out of range",
                    self.config.retention_days
                ))
            })?;
        let mut conversation = Vec::with_capacity(turns.len());

        for turn in turns {
            let audio_key =
                response_audio_key(key, turn.turn_number, turn.response_audio.codec);

            self.bounded("response audio upload", async {
                self.objects
                    .put(
                        &audio_key,
                        &turn.response_audio.bytes,
                        turn.response_audio.codec.content_type(),
                    )
                    .await
            })
            .await?;
            info!("Uploaded response audio: {}", audio_key);

            conversation.push(PersistedTurn {
                turn_number: turn.turn_number,
                query_text: turn.query_text.clone(),
                answer_text: turn.answer_text.clone(),
                query_audio_ref: turn.query_audio_ref.clone(),
                response_audio_key: audio_key,
                timestamp: turn.timestamp,
            });
        }

        let record = PersistedConversation {
            session_id: key.session_id.clone(),
            lecture_id: key.lecture_id.clone(),
            total_turns: conversation.len(),
            conversation,
            created_at: now,
            expires_at,
        };

        self.bounded("session record upsert", self.sessions.upsert(&record))
            .await?;

        Ok(FinalizeSummary {
            turns_persisted: record.total_turns,
            session_id: key.session_id.clone(),
        })
    }

    async fn bounded<T, E, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        E: std::fmt::Display,
        F: Future<Output = std::result::Result<T, E>>,
    {
        let limit: Duration = self.config.storage_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AgentError::persistence(format!("{operation} failed: {e}"))),
            Err(_) => Err(AgentError::persistence(format!(
                "{operation} timed out after {}s",
                limit.as_secs()
            ))),
        }
    }
}
