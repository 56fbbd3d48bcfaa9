use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const ENDPOINT_PATH: &str =
    "ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub model: String,
    pub api_key: String,
    /// HTTP proxy used to tunnel the websocket (e.g. "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Samples per captured frame
    pub chunk_size: usize,
    /// Frames buffered between capture and transmission
    pub queue_capacity: usize,
    /// Mean absolute amplitude above which a frame counts as speech
    pub voice_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// Speech synthesis credential; playback is disabled without it
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// `LOQA_<SECTION>__<KEY>` variables override file values. The well-known
    /// `GOOGLE_API_KEY`, `GEMINI_MODEL`, `HTTP_PROXY` and `ELEVENLABS_API_KEY`
    /// variables win over everything else.
    pub fn load(path: &str) -> Result<Self> {
        // A missing .env file is fine
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("service.host", "generativelanguage.googleapis.com")?
            .set_default("service.model", "gemini-2.0-flash-exp")?
            .set_default("service.handshake_timeout_secs", 30_i64)?
            .set_default("audio.sample_rate", 16_000_i64)?
            .set_default("audio.chunk_size", 512_i64)?
            .set_default("audio.queue_capacity", 32_i64)?
            .set_default("audio.voice_threshold", 200.0)?
            .set_default("voice.voice_id", "nPczCjzI2devNBz1zQrb")?
            .set_default("voice.model_id", "eleven_flash_v2_5")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LOQA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("service.api_key", env_var("GOOGLE_API_KEY"))?
            .set_override_option("service.model", env_var("GEMINI_MODEL"))?
            .set_override_option("service.proxy", env_var("HTTP_PROXY"))?
            .set_override_option("voice.api_key", env_var("ELEVENLABS_API_KEY"))?
            .build()?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration (is GOOGLE_API_KEY set?)")?;

        if cfg.service.api_key.trim().is_empty() {
            anyhow::bail!("service.api_key is empty; set GOOGLE_API_KEY");
        }

        Ok(cfg)
    }
}

impl ServiceConfig {
    /// Websocket endpoint including the credential.
    pub fn endpoint(&self) -> String {
        format!("wss://{}/{}?key={}", self.host, ENDPOINT_PATH, self.api_key)
    }

    /// Endpoint safe to print in logs.
    pub fn redacted_endpoint(&self) -> String {
        format!("wss://{}/{}?key=***", self.host, ENDPOINT_PATH)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ServiceConfig {
        ServiceConfig {
            host: "example.test".to_string(),
            model: "m".to_string(),
            api_key: "secret".to_string(),
            proxy: None,
            handshake_timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_carries_key() {
        let svc = service();
        assert_eq!(
            svc.endpoint(),
            "wss://example.test/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent?key=secret"
        );
        assert!(!svc.redacted_endpoint().contains("secret"));
        assert_eq!(svc.handshake_timeout(), Duration::from_secs(5));
    }
}
