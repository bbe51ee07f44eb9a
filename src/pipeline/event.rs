use crate::error::{AgentError, Result};
use base64::Engine;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One streamed unit of a query's output.
///
/// A pipeline emits a prefix of `QueryText, AnswerText, AudioChunk*, AudioComplete`,
/// optionally cut short by exactly one `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    QueryText(String),
    AnswerText(String),
    AudioChunk { index: usize, data: Vec<u8> },
    AudioComplete,
    Error(String),
}

/// Newline-delimited JSON representation of an [`Event`]
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    QueryText { text: String },
    AnswerText { text: String },
    /// Base64-encoded audio bytes
    AudioChunk { data: String, index: usize },
    AudioComplete,
    Error { message: String },
}

impl Event {
    /// `AudioComplete` and `Error` end a stream; nothing follows them
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::AudioComplete | Event::Error(_))
    }

    fn to_wire(&self) -> WireEvent {
        match self {
            Event::QueryText(text) => WireEvent::QueryText { text: text.clone() },
            Event::AnswerText(text) => WireEvent::AnswerText { text: text.clone() },
            Event::AudioChunk { index, data } => WireEvent::AudioChunk {
                data: base64::engine::general_purpose::STANDARD.encode(data),
                index: *index,
            },
            Event::AudioComplete => WireEvent::AudioComplete,
            Event::Error(message) => WireEvent::Error {
                message: message.clone(),
            },
        }
    }

    /// Serialize as one JSON object followed by `\n`
    pub fn to_json_line(&self) -> String {
        // A flat enum of strings and integers always serializes
        let mut line = serde_json::to_string(&self.to_wire()).unwrap_or_default();
        line.push('\n');
        line
    }

    /// Parse one line of the event stream (trailing newline optional)
    pub fn from_json_line(line: &str) -> Result<Self> {
        let wire: WireEvent = serde_json::from_str(line.trim_end())
            .map_err(|e| AgentError::malformed(format!("invalid event line: {e}")))?;

        Ok(match wire {
            WireEvent::QueryText { text } => Event::QueryText(text),
            WireEvent::AnswerText { text } => Event::AnswerText(text),
            WireEvent::AudioChunk { data, index } => Event::AudioChunk {
                index,
                data: base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| AgentError::malformed(format!("invalid audio chunk: {e}")))?,
            },
            WireEvent::AudioComplete => Event::AudioComplete,
            WireEvent::Error { message } => Event::Error(message),
        })
    }
}

/// Adapt a pipeline's event receiver into a stream of NDJSON lines.
///
/// Dropping the stream drops the receiver, which the pipeline observes as cancellation.
pub fn ndjson_lines(events: mpsc::Receiver<Event>) -> impl Stream<Item = String> + Send {
    stream::unfold(events, |mut events| async move {
        events
            .recv()
            .await
            .map(|event| (event.to_json_line(), events))
    })
}
