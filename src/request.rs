//! Inbound invocation payloads.
//!
//! Requests arrive as a tagged union on `/invoke` or as a bare finalize body on
//! `/end_session`. Unknown fields and unknown `type` tags are rejected; every
//! identifier is validated before any pipeline stage runs.

use crate::error::{AgentError, Result};
use crate::session::SessionKey;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "query")]
    Query(QueryRequest),

    #[serde(rename = "finalize", alias = "end_session")]
    Finalize(FinalizeRequest),
}

/// Ask a question about a lecture using previously uploaded query audio.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryRequest {
    pub session_id: String,
    pub lecture_id: String,

    /// Object store key of the uploaded query audio
    #[serde(alias = "s3Key")]
    pub query_audio_ref: String,

    /// Transport connection, carried only for log correlation
    #[serde(default)]
    pub connection_id: Option<String>,
}

/// Persist everything a session accumulated and release it from memory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinalizeRequest {
    pub session_id: String,
    pub lecture_id: String,
}

impl Request {
    /// Parse and validate a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let request: Request =
            serde_json::from_slice(body).map_err(|e| AgentError::malformed(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Request::Query(query) => query.validate(),
            Request::Finalize(finalize) => finalize.validate(),
        }
    }
}

impl QueryRequest {
    pub fn validate(&self) -> Result<()> {
        validate_identifier("sessionId", &self.session_id)?;
        validate_identifier("lectureId", &self.lecture_id)?;
        if self.query_audio_ref.trim().is_empty() {
            return Err(AgentError::malformed("queryAudioRef must not be empty"));
        }
        Ok(())
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.session_id, &self.lecture_id)
    }
}

impl FinalizeRequest {
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let request: FinalizeRequest =
            serde_json::from_slice(body).map_err(|e| AgentError::malformed(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier("sessionId", &self.session_id)?;
        validate_identifier("lectureId", &self.lecture_id)
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.session_id, &self.lecture_id)
    }
}

/// Identifiers end up in storage keys and file names, so keep them to a safe alphabet.
fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AgentError::malformed(format!("{field} must not be empty")));
    }
    if value == "." || value == ".." {
        return Err(AgentError::malformed(format!("{field} is not a valid identifier")));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(AgentError::malformed(format!(
            "{field} contains characters outside [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}
