//! Remote AI capabilities the query pipeline depends on.
//!
//! The models themselves live elsewhere; this module only defines the narrow
//! request/response contracts and OpenAI-compatible HTTP adapters for them.

mod chat;
mod speech;

pub use chat::ChatCompletionsClient;
pub use speech::SpeechClient;

use crate::error::CapabilityError;
use crate::session::HistoryMessage;
use serde::Deserialize;
use std::path::Path;

/// Compressed audio codec of synthesized speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
    Wav,
}

impl AudioCodec {
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "audio/mpeg",
            AudioCodec::Wav => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Wav => "wav",
        }
    }
}

/// Raw audio returned by the synthesis capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub codec: AudioCodec,
}

impl SynthesizedAudio {
    pub fn new(bytes: Vec<u8>, codec: AudioCodec) -> Self {
        Self { bytes, codec }
    }
}

const QUERY_AUDIO_FORMATS: &[&str] = &["webm", "mp3", "wav", "m4a", "mp4", "ogg", "flac"];

/// Query audio fetched from the object store, together with the key it was stored under
#[derive(Debug, Clone)]
pub struct QueryAudio {
    pub key: String,
    pub bytes: Vec<u8>,
}

impl QueryAudio {
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            bytes,
        }
    }

    /// Container format derived from the key's extension; browsers record webm by default
    pub fn format(&self) -> &'static str {
        let ext = Path::new(&self.key)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        ext.and_then(|ext| QUERY_AUDIO_FORMATS.iter().copied().find(|f| *f == ext))
            .unwrap_or("webm")
    }
}

/// Speech-to-text capability.
///
/// Silence or non-speech should come back as an empty string, not an error.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &QueryAudio) -> Result<String, CapabilityError>;
}

/// Context-aware question answering about a lecture
#[async_trait::async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `question` about `lecture_id`, given prior exchanges oldest first
    async fn answer(
        &self,
        lecture_id: &str,
        question: &str,
        history: &[HistoryMessage],
    ) -> Result<String, CapabilityError>;
}

/// Text-to-speech capability
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_audio_format_from_extension() {
        assert_eq!(QueryAudio::new("queries/s1/a.WAV", vec![]).format(), "wav");
        assert_eq!(QueryAudio::new("queries/s1/a.m4a", vec![]).format(), "m4a");
        assert_eq!(QueryAudio::new("queries/s1/a", vec![]).format(), "webm");
        assert_eq!(QueryAudio::new("queries/s1/a.exe", vec![]).format(), "webm");
    }

    #[test]
    fn test_codec_metadata() {
        assert_eq!(AudioCodec::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioCodec::Mp3.extension(), "mp3");
    }
}
