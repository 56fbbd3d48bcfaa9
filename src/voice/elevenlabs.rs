use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::sync::mpsc;
use tracing::{debug, info, warn};

use super::player::play_pcm_stream;
use super::SpeechSynthesizer;
use crate::config::VoiceConfig;
use crate::error::{Result, SessionError};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Raw PCM format requested from the service
const OUTPUT_FORMAT: &str = "pcm_16000";
const OUTPUT_SAMPLE_RATE: u32 = 16000;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs text-to-speech played on the default output device.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: String, voice_id: String, model_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            voice_id,
            model_id,
        }
    }

    /// `None` when no credential is configured, which disables playback.
    pub fn from_config(config: &VoiceConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty())?;
        info!("Voice mode enabled (voice {}, model {})", config.voice_id, config.model_id);
        Some(Self::new(
            api_key,
            config.voice_id.clone(),
            config.model_id.clone(),
        ))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream?output_format={}",
            self.base_url.trim_end_matches('/'),
            self.voice_id,
            OUTPUT_FORMAT
        )
    }

    /// Start synthesis of `text`. The body streams 16 kHz mono PCM.
    async fn request(&self, text: &str) -> Result<reqwest::Response> {
        self.client
            .post(self.stream_url())
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| SessionError::Playback(format!("speech request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SessionError::Playback(format!("speech service rejected request: {e}")))
    }
}

/// Little-endian 16-bit PCM from byte chunks split at arbitrary offsets.
#[derive(Debug, Default)]
struct PcmDecoder {
    carry: Option<u8>,
}

impl PcmDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<i16> {
        let mut bytes = bytes;
        let mut samples = Vec::with_capacity((bytes.len() + 1) / 2);

        if let Some(low) = self.carry.take() {
            match bytes.split_first() {
                Some((&high, rest)) => {
                    samples.push(i16::from_le_bytes([low, high]));
                    bytes = rest;
                }
                None => {
                    self.carry = Some(low);
                    return samples;
                }
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        samples.extend(pairs.by_ref().map(|b| i16::from_le_bytes([b[0], b[1]])));
        self.carry = pairs.remainder().first().copied();
        samples
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        let mut body = self.request(text).await?.bytes_stream();
        let mut decoder = PcmDecoder::default();

        // Open the output device only once there is audio to play
        let first = loop {
            match body.next().await {
                Some(Ok(bytes)) => {
                    let samples = decoder.push(&bytes);
                    if !samples.is_empty() {
                        break samples;
                    }
                }
                Some(Err(e)) => {
                    return Err(SessionError::Playback(format!("speech stream interrupted: {e}")))
                }
                None => {
                    return Err(SessionError::Playback(
                        "speech service returned no audio".to_string(),
                    ))
                }
            }
        };

        let (chunks_tx, chunks_rx) = mpsc::channel();
        let mut streamed = first.len();
        let _ = chunks_tx.send(first);
        let player =
            tokio::task::spawn_blocking(move || play_pcm_stream(chunks_rx, OUTPUT_SAMPLE_RATE));

        let mut interrupted = None;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    let samples = decoder.push(&bytes);
                    streamed += samples.len();
                    if chunks_tx.send(samples).is_err() {
                        warn!("Playback ended before the speech stream finished");
                        break;
                    }
                }
                Err(e) => {
                    interrupted = Some(e);
                    break;
                }
            }
        }
        drop(chunks_tx);
        debug!("Streamed {} samples of synthesized audio", streamed);

        player
            .await
            .map_err(|e| SessionError::Playback(format!("playback thread failed: {e}")))??;

        match interrupted {
            Some(e) => Err(SessionError::Playback(format!("speech stream interrupted: {e}"))),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "ElevenLabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_credential() {
        let config = VoiceConfig {
            api_key: None,
            voice_id: "v".to_string(),
            model_id: "m".to_string(),
        };
        assert!(ElevenLabsSynthesizer::from_config(&config).is_none());

        let config = VoiceConfig {
            api_key: Some("  ".to_string()),
            ..config
        };
        assert!(ElevenLabsSynthesizer::from_config(&config).is_none());
    }

    #[test]
    fn stream_url_requests_raw_pcm() {
        let synth = ElevenLabsSynthesizer::new("k".into(), "voice".into(), "model".into())
            .with_base_url("http://localhost:9/");
        assert_eq!(
            synth.stream_url(),
            "http://localhost:9/v1/text-to-speech/voice/stream?output_format=pcm_16000"
        );
    }

    #[test]
    fn decoder_joins_samples_split_across_chunks() {
        let mut decoder = PcmDecoder::default();
        // 0x0201, -2 (0xfffe), 0x0403 split at odd offsets
        assert_eq!(decoder.push(&[0x01]), Vec::<i16>::new());
        assert_eq!(decoder.push(&[]), Vec::<i16>::new());
        assert_eq!(decoder.push(&[0x02, 0xfe, 0xff, 0x03]), vec![0x0201, -2]);
        assert_eq!(decoder.push(&[0x04]), vec![0x0403]);
        assert_eq!(decoder.carry, None);
    }

    #[tokio::test]
    async fn unreachable_service_is_playback_error() {
        // Port 9 (discard) is not expected to accept HTTP
        let synth = ElevenLabsSynthesizer::new("k".into(), "voice".into(), "model".into())
            .with_base_url("http://127.0.0.1:9");
        let err = synth.speak("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Playback(_)));
    }
}
