//! OpenAI-compatible chat completions client (vLLM) used for both transcription and answering.

use super::{Answerer, QueryAudio, Transcriber};
use crate::config::{CapabilitiesConfig, PipelineConfig};
use crate::error::CapabilityError;
use crate::session::HistoryMessage;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Sampling settings for one kind of completion
#[derive(Debug, Clone)]
struct Generation {
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
    transcribe_prompt: String,
    transcription: Generation,
    answering: Generation,
    system_prompt: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::from_config(
            &CapabilitiesConfig {
                llm_endpoint: endpoint.into(),
                llm_model: model.into(),
                ..CapabilitiesConfig::default()
            },
            &PipelineConfig::default(),
        )
    }

    pub fn from_config(capabilities: &CapabilitiesConfig, pipeline: &PipelineConfig) -> Self {
        info!(
            "Chat completions client using endpoint {}",
            capabilities.llm_endpoint
        );
        Self {
            client: Client::new(),
            endpoint: capabilities.llm_endpoint.trim_end_matches('/').to_string(),
            model: capabilities.llm_model.clone(),
            transcribe_prompt: capabilities.transcribe_prompt.clone(),
            transcription: Generation {
                temperature: capabilities.transcribe_temperature,
                max_tokens: capabilities.transcribe_max_tokens,
                timeout: pipeline.transcribe_timeout(),
            },
            answering: Generation {
                temperature: capabilities.answer_temperature,
                max_tokens: capabilities.answer_max_tokens,
                timeout: pipeline.answer_timeout(),
            },
            system_prompt: capabilities.answer_system_prompt.clone(),
        }
    }

    /// Sets a system prompt for answering; `{lecture_id}` is substituted per request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        generation: &Generation,
    ) -> Result<String, CapabilityError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .timeout(generation.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| CapabilityError::InvalidResponse(format!("unparseable completion: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| CapabilityError::InvalidResponse("completion had no choices".into()))
    }
}

#[async_trait]
impl Transcriber for ChatCompletionsClient {
    async fn transcribe(&self, audio: &QueryAudio) -> Result<String, CapabilityError> {
        info!("Transcribing {} ({} bytes)", audio.key, audio.bytes.len());

        let data_url = format!(
            "data:audio/{};base64,{}",
            audio.format(),
            BASE64_STANDARD.encode(&audio.bytes)
        );
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: self.transcribe_prompt.clone(),
                },
                ContentPart::AudioUrl {
                    audio_url: AudioUrl { url: data_url },
                },
            ]),
        }];

        let transcript = self.complete(messages, &self.transcription).await?;
        info!("Transcription completed: {} chars", transcript.len());
        Ok(transcript)
    }
}

#[async_trait]
impl Answerer for ChatCompletionsClient {
    async fn answer(
        &self,
        lecture_id: &str,
        question: &str,
        history: &[HistoryMessage],
    ) -> Result<String, CapabilityError> {
        info!("Answering question for lecture {}", lecture_id);

        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::text(
                "system",
                prompt.replace("{lecture_id}", lecture_id),
            ));
        }
        for message in history {
            messages.push(ChatMessage::text(message.role.as_str(), message.text.clone()));
        }
        messages.push(ChatMessage::text("user", question));

        let answer = self.complete(messages, &self.answering).await?;
        info!("Answer completed: {} chars", answer.len());
        Ok(answer)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

impl ChatMessage {
    fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(text.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    AudioUrl { audio_url: AudioUrl },
}

#[derive(Debug, Serialize)]
struct AudioUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
