use super::{AudioCodec, SynthesizedAudio, Synthesizer};
use crate::config::{CapabilitiesConfig, PipelineConfig};
use crate::error::CapabilityError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Client for an OpenAI-compatible `/v1/audio/speech` endpoint (gTTS sidecar)
///
/// Requests the configured `tts_format` and labels the returned bytes with it.
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    endpoint: String,
    model: String,
    voice: String,
    codec: AudioCodec,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

impl SpeechClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::from_config(
            &CapabilitiesConfig {
                tts_endpoint: endpoint.into(),
                ..CapabilitiesConfig::default()
            },
            &PipelineConfig::default(),
        )
    }

    pub fn from_config(capabilities: &CapabilitiesConfig, pipeline: &PipelineConfig) -> Self {
        info!("Speech client using endpoint {}", capabilities.tts_endpoint);
        Self {
            client: Client::new(),
            endpoint: capabilities.tts_endpoint.trim_end_matches('/').to_string(),
            model: capabilities.tts_model.clone(),
            voice: capabilities.tts_voice.clone(),
            codec: capabilities.tts_format,
            timeout: pipeline.synthesize_timeout(),
        }
    }
}

#[async_trait]
impl Synthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, CapabilityError> {
        info!("Generating speech for {} characters", text.len());

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.endpoint))
            .timeout(self.timeout)
            .json(&SpeechRequest {
                model: &self.model,
                input: text,
                voice: &self.voice,
                response_format: self.codec.extension(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read speech error body".to_string());
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?.to_vec();
        info!("Speech synthesis completed: {} bytes", bytes.len());
        Ok(SynthesizedAudio::new(bytes, self.codec))
    }
}
