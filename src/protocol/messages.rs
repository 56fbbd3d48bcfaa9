use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;
use crate::error::Result;

/// Media type tag on outbound audio
pub const PCM_MIME_TYPE: &str = "audio/pcm";

/// Message sent to the conversation service.
///
/// Serializes externally tagged, e.g. `{"realtime_input": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Setup(SetupPayload),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupPayload {
    pub model: String,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientContent {
    pub turns: Vec<ContentTurn>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTurn {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaChunk {
    /// Base64-encoded PCM bytes
    pub data: String,
    pub mime_type: String,
}

impl ClientMessage {
    /// Session configuration: text responses from `model`.
    pub fn setup(model: &str) -> Self {
        ClientMessage::Setup(SetupPayload {
            model: format!("models/{}", model),
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string()],
            },
        })
    }

    /// A complete user turn carrying `text`.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![ContentTurn {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    /// Wrap one captured frame for streaming.
    pub fn audio(frame: &AudioFrame) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                data: base64::engine::general_purpose::STANDARD.encode(frame.to_pcm_bytes()),
                mime_type: PCM_MIME_TYPE.to_string(),
            }],
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One decoded unit of what the service sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Partial response text
    TextFragment(String),
    /// The current turn is finished
    TurnComplete,
    /// Reply to the setup message
    SetupComplete,
    /// Anything else (tool calls, usage metadata, ...)
    Other,
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(rename = "serverContent")]
    server_content: Option<ServerContent>,
    #[serde(rename = "setupComplete")]
    setup_complete: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ServerContent {
    #[serde(rename = "modelTurn")]
    model_turn: Option<ModelTurn>,
    #[serde(rename = "turnComplete", default)]
    turn_complete: bool,
}

#[derive(Debug, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<ModelPart>,
}

#[derive(Debug, Deserialize)]
struct ModelPart {
    text: Option<String>,
}

/// Decode one wire message into frames, in the order they apply.
///
/// A message can carry several text parts and a completion marker at once;
/// the fragments come first. Malformed JSON is a protocol error.
pub fn decode_frames(payload: &[u8]) -> Result<Vec<InboundFrame>> {
    let message: ServerMessage = serde_json::from_slice(payload)?;
    let mut frames = Vec::new();

    if message.setup_complete.is_some() {
        frames.push(InboundFrame::SetupComplete);
    }

    if let Some(content) = message.server_content {
        let texts = content
            .model_turn
            .into_iter()
            .flat_map(|turn| turn.parts)
            .filter_map(|part| part.text)
            .filter(|text| !text.is_empty());
        frames.extend(texts.map(InboundFrame::TextFragment));

        if content.turn_complete {
            frames.push(InboundFrame::TurnComplete);
        }
    }

    if frames.is_empty() {
        frames.push(InboundFrame::Other);
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[test]
    fn setup_message_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&ClientMessage::setup("gemini-2.0-flash-exp").to_json().unwrap())
                .unwrap();
        assert_eq!(json["setup"]["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(
            json["setup"]["generation_config"]["response_modalities"][0],
            "TEXT"
        );
    }

    #[test]
    fn user_text_message_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&ClientMessage::user_text("hi").to_json().unwrap()).unwrap();
        assert_eq!(json["client_content"]["turns"][0]["role"], "user");
        assert_eq!(json["client_content"]["turns"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["client_content"]["turn_complete"], true);
    }

    #[test]
    fn audio_message_encodes_little_endian_pcm() {
        let frame = AudioFrame {
            samples: vec![1, -2],
            sample_rate: 16000,
            timestamp_ms: 0,
        };
        let json: serde_json::Value =
            serde_json::from_str(&ClientMessage::audio(&frame).to_json().unwrap()).unwrap();
        let chunk = &json["realtime_input"]["media_chunks"][0];
        assert_eq!(chunk["mime_type"], "audio/pcm");

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(chunk["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn decodes_fragments_then_completion() {
        let payload = br#"{"serverContent":{"modelTurn":{"parts":[{"text":"Hel"},{"text":"lo"}]},"turnComplete":true}}"#;
        assert_eq!(
            decode_frames(payload).unwrap(),
            vec![
                InboundFrame::TextFragment("Hel".to_string()),
                InboundFrame::TextFragment("lo".to_string()),
                InboundFrame::TurnComplete,
            ]
        );
    }

    #[test]
    fn decodes_setup_complete_and_unknown_messages() {
        assert_eq!(
            decode_frames(br#"{"setupComplete":{}}"#).unwrap(),
            vec![InboundFrame::SetupComplete]
        );
        assert_eq!(
            decode_frames(br#"{"usageMetadata":{"totalTokenCount":3}}"#).unwrap(),
            vec![InboundFrame::Other]
        );
        assert_eq!(
            decode_frames(br#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{}}]}}}"#)
                .unwrap(),
            vec![InboundFrame::Other]
        );
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        assert!(matches!(
            decode_frames(b"not json"),
            Err(SessionError::Protocol(_))
        ));
    }
}
