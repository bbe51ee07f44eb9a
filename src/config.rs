use crate::capability::AudioCodec;
use crate::error::{AgentError, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
    pub memory: MemoryConfig,
    pub finalize: FinalizeConfig,
    pub capabilities: CapabilitiesConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "lecture-qa".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Query pipeline tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Size of each streamed audio chunk in bytes (final chunk may be shorter)
    pub chunk_size: usize,

    /// Number of most recent persisted turns fed to the answering capability
    pub history_limit: usize,

    /// Capacity of the bounded event channel between pipeline and transport
    pub event_buffer: usize,

    pub fetch_timeout_secs: u64,
    pub transcribe_timeout_secs: u64,
    pub answer_timeout_secs: u64,
    pub synthesize_timeout_secs: u64,
    pub history_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            history_limit: 10,
            event_buffer: 32,
            fetch_timeout_secs: 30,
            transcribe_timeout_secs: 30,
            answer_timeout_secs: 60,
            synthesize_timeout_secs: 30,
            history_timeout_secs: 10,
        }
    }
}

impl PipelineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.transcribe_timeout_secs)
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_secs)
    }

    pub fn synthesize_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesize_timeout_secs)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs)
    }
}

/// Session memory eviction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Sessions untouched for this long are evicted along with their turns
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

impl MemoryConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Upper bound for `finalize.retention_days` (ten years)
pub const MAX_RETENTION_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    /// How long persisted conversations live before external garbage collection
    pub retention_days: i64,
    pub storage_timeout_secs: u64,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            storage_timeout_secs: 30,
        }
    }
}

impl FinalizeConfig {
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub llm_endpoint: String,
    pub llm_model: String,
    pub transcribe_prompt: String,
    pub transcribe_temperature: f32,
    pub transcribe_max_tokens: u32,
    pub answer_temperature: f32,
    pub answer_max_tokens: u32,
    /// Optional system prompt; `{lecture_id}` is replaced with the lecture being discussed
    pub answer_system_prompt: Option<String>,
    pub tts_endpoint: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Codec requested from the speech endpoint; decides response audio keys and content types
    pub tts_format: AudioCodec,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            llm_endpoint: "http://localhost:8000".to_string(),
            llm_model: "Qwen/Qwen2.5-Omni-3B".to_string(),
            transcribe_prompt: "Please transcribe this audio accurately:".to_string(),
            transcribe_temperature: 0.1,
            transcribe_max_tokens: 512,
            answer_temperature: 0.7,
            answer_max_tokens: 1024,
            answer_system_prompt: None,
            tts_endpoint: "http://localhost:8001".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_format: AudioCodec::Mp3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub audio_root: String,
    pub sessions_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_root: "data/audio".to_string(),
            sessions_root: "data/sessions".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `LECTURE_QA__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LECTURE_QA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| AgentError::Config {
                message: e.to_string(),
            })?;

        let cfg: Config = settings.try_deserialize().map_err(|e| AgentError::Config {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(AgentError::Config {
                message: message.to_string(),
            })
        };

        if self.pipeline.chunk_size == 0 {
            return invalid("pipeline.chunk_size must be positive");
        }
        if self.pipeline.event_buffer == 0 {
            return invalid("pipeline.event_buffer must be positive");
        }
        if self.pipeline.history_limit == 0 {
            return invalid("pipeline.history_limit must be positive");
        }
        let timeouts = [
            self.pipeline.fetch_timeout_secs,
            self.pipeline.transcribe_timeout_secs,
            self.pipeline.answer_timeout_secs,
            self.pipeline.synthesize_timeout_secs,
            self.pipeline.history_timeout_secs,
            self.finalize.storage_timeout_secs,
        ];
        if timeouts.contains(&0) {
            return invalid("timeouts must be positive");
        }
        if self.memory.idle_ttl_secs == 0 || self.memory.sweep_interval_secs == 0 {
            return invalid("memory.idle_ttl_secs and memory.sweep_interval_secs must be positive");
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.finalize.retention_days) {
            return invalid("finalize.retention_days must be between 1 and 3650");
        }
        Ok(())
    }
}
