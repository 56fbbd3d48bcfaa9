use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::config::Config;
use crate::protocol::TUTOR_PROMPT;

/// Configuration for a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-<uuid>")
    pub session_id: String,

    /// Model identifier, without the "models/" prefix
    pub model: String,

    /// Instructions sent as the first user turn
    pub prompt: String,

    /// How long to wait for the service to acknowledge the prompt
    pub handshake_timeout: Duration,

    /// Sample rate for captured audio (the service expects 16kHz)
    pub sample_rate: u32,

    /// Samples per captured frame
    pub chunk_size: usize,

    /// Frames buffered between capture and transmission
    pub queue_capacity: usize,

    /// Mean absolute amplitude that counts as the user speaking
    pub voice_threshold: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            model: "gemini-2.0-flash-exp".to_string(),
            prompt: TUTOR_PROMPT.to_string(),
            handshake_timeout: Duration::from_secs(30),
            sample_rate: 16000,
            chunk_size: 512,
            queue_capacity: 32,
            voice_threshold: 200.0,
        }
    }
}

impl SessionConfig {
    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            model: cfg.service.model.clone(),
            handshake_timeout: cfg.service.handshake_timeout(),
            sample_rate: cfg.audio.sample_rate,
            chunk_size: cfg.audio.chunk_size,
            queue_capacity: cfg.audio.queue_capacity,
            voice_threshold: cfg.audio.voice_threshold,
            ..Self::default()
        }
    }
}
