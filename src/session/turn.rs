use crate::capability::{AudioCodec, SynthesizedAudio};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one conversational session about one lecture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub session_id: String,
    pub lecture_id: String,
}

impl SessionKey {
    pub fn new(session_id: impl Into<String>, lecture_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            lecture_id: lecture_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.lecture_id)
    }
}

/// A fully answered query that has not been numbered yet
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub query_audio_ref: String,
    pub query_text: String,
    pub answer_text: String,
    pub response_audio: SynthesizedAudio,
    pub timestamp: DateTime<Utc>,
}

impl TurnDraft {
    pub(crate) fn into_turn(self, turn_number: u32) -> Turn {
        Turn {
            turn_number,
            query_audio_ref: self.query_audio_ref,
            query_text: self.query_text,
            answer_text: self.answer_text,
            response_audio: self.response_audio,
            timestamp: self.timestamp,
        }
    }
}

/// One completed query + answer + response audio within a session.
///
/// Turn numbers are 1-based and assigned by [`SessionMemory`](super::SessionMemory).
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub turn_number: u32,
    pub query_audio_ref: String,
    pub query_text: String,
    pub answer_text: String,
    pub response_audio: SynthesizedAudio,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub(crate) fn renumbered(self, turn_number: u32) -> Turn {
        Turn {
            turn_number,
            ..self
        }
    }
}

/// A turn as stored in the session store: response audio by reference, not inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTurn {
    #[serde(rename = "turn")]
    pub turn_number: u32,
    pub query_text: String,
    #[serde(rename = "responseText")]
    pub answer_text: String,
    #[serde(rename = "queryAudio")]
    pub query_audio_ref: String,
    #[serde(rename = "responseAudio")]
    pub response_audio_key: String,
    pub timestamp: DateTime<Utc>,
}

/// The persisted record for a finalized session. Replaced wholesale on every finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConversation {
    pub session_id: String,
    pub lecture_id: String,
    pub conversation: Vec<PersistedTurn>,
    pub total_turns: usize,
    pub created_at: DateTime<Utc>,
    /// Unix seconds, consumed by the store's own TTL garbage collection
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl PersistedConversation {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.session_id, &self.lecture_id)
    }
}

/// Deterministic object key for a turn's response audio, unique per session record
pub fn response_audio_key(key: &SessionKey, turn_number: u32, codec: AudioCodec) -> String {
    format!(
        "responses/{}/{}/response-{}.{}",
        key.session_id,
        key.lecture_id,
        turn_number,
        codec.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_response_audio_key_format() {
        assert_eq!(
            response_audio_key(&SessionKey::new("s1", "L1"), 3, AudioCodec::Mp3),
            "responses/s1/L1/response-3.mp3"
        );
    }

    #[test]
    fn test_response_audio_key_follows_codec() {
        assert_eq!(
            response_audio_key(&SessionKey::new("s1", "L1"), 2, AudioCodec::Wav),
            "responses/s1/L1/response-2.wav"
        );
    }

    #[test]
    fn test_response_audio_key_differs_per_lecture() {
        let first = response_audio_key(&SessionKey::new("s1", "L1"), 1, AudioCodec::Mp3);
        let second = response_audio_key(&SessionKey::new("s1", "L2"), 1, AudioCodec::Mp3);
        assert_ne!(first, second);
    }

    #[test]
    fn test_persisted_conversation_wire_shape() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = PersistedConversation {
            session_id: "s1".to_string(),
            lecture_id: "L1".to_string(),
            conversation: vec![PersistedTurn {
                turn_number: 1,
                query_text: "hello".to_string(),
                answer_text: "hi there".to_string(),
                query_audio_ref: "queries/s1/q.webm".to_string(),
                response_audio_key: "responses/s1/L1/response-1.mp3".to_string(),
                timestamp: created,
            }],
            total_turns: 1,
            created_at: created,
            expires_at: Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["totalTurns"], 1);
        assert_eq!(json["expiresAt"], 1741435200);
        assert_eq!(json["conversation"][0]["turn"], 1);
        assert_eq!(json["conversation"][0]["responseText"], "hi there");
        assert_eq!(
            json["conversation"][0]["responseAudio"],
            "responses/s1/L1/response-1.mp3"
        );

        let back: PersistedConversation = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
