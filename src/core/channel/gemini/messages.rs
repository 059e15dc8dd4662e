//! Gemini Live API WebSocket message types.
//!
//! All messages are JSON objects with a single top-level field naming the
//! message kind.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Negotiate model, response modality, voice, and persona
//! - realtimeInput - Stream microphone audio chunks
//!
//! Server messages (received from server):
//! - setupComplete - Setup accepted, audio may flow
//! - serverContent - Synthesized audio, interruption and turn-completion flags
//!
//! Unknown message kinds and unknown fields are ignored; the protocol grows
//! without breaking older clients.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{GeminiChannelConfig, INPUT_AUDIO_MIME};

// =============================================================================
// Shared Content Types
// =============================================================================

/// A content block: an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary payload (base64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64-encoded binary payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64-encoded data
    pub data: String,
}

impl Content {
    /// A single-part text content block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

// =============================================================================
// Client Messages (sent to server)
// =============================================================================

/// Client messages sent to the Gemini Live API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Session setup, must be the first message on the socket
    Setup(Setup),
    /// Streamed microphone audio
    RealtimeInput(RealtimeInput),
}

/// Setup negotiation payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Fully qualified model resource name ("models/...")
    pub model: String,
    /// Response generation parameters
    pub generation_config: GenerationConfig,
    /// Persona instruction for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

/// Generation parameters negotiated at setup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested response modalities; this pipeline is audio-only
    pub response_modalities: Vec<String>,
    /// Speech synthesis parameters
    pub speech_config: SpeechConfig,
}

/// Speech synthesis parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Voice selection
    pub voice_config: VoiceConfig,
}

/// Voice selection wrapper.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// Prebuilt voice selection
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Named prebuilt voice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    /// Voice name, e.g. "Kore"
    pub voice_name: String,
}

/// Streamed input payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    /// Audio chunks in capture order
    pub media_chunks: Vec<MediaBlob>,
}

/// One outbound media chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// MIME type, e.g. "audio/pcm;rate=16000"
    pub mime_type: String,
    /// Base64-encoded PCM16LE samples
    pub data: String,
}

impl ClientMessage {
    /// Build the setup message for a channel configuration.
    pub fn setup(config: &GeminiChannelConfig) -> Self {
        ClientMessage::Setup(Setup {
            model: config.model.resource_name(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: config.voice.as_str().to_string(),
                        },
                    },
                },
            },
            system_instruction: config.instructions.clone().map(Content::text),
        })
    }

    /// Build an audio chunk message from raw PCM16LE bytes.
    pub fn audio_chunk(pcm: &[u8]) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaBlob {
                mime_type: INPUT_AUDIO_MIME.to_string(),
                data: BASE64_STANDARD.encode(pcm),
            }],
        })
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// Server message envelope.
///
/// Modeled as a struct of optional fields rather than an enum so that
/// messages carrying unknown top-level fields still parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Setup accepted
    pub setup_complete: Option<SetupComplete>,
    /// Model output and stream control flags
    pub server_content: Option<ServerContent>,
}

/// Empty acknowledgment of the setup message.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupComplete {}

/// Model output plus stream control flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// Synthesized speech for the current model turn
    pub model_turn: Option<Content>,
    /// The user barged in; discard scheduled playback
    pub interrupted: Option<bool>,
    /// The model finished its turn
    pub turn_complete: Option<bool>,
}

impl ServerMessage {
    /// Whether this message acknowledges setup.
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Base64 audio payload of the first model-turn part, if any.
    pub fn audio_payload(&self) -> Option<&str> {
        self.server_content
            .as_ref()?
            .model_turn
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|data| data.data.as_str())
    }

    /// Decode the audio payload to raw PCM16LE bytes, if present.
    pub fn decode_audio(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.audio_payload()
            .map(|payload| BASE64_STANDARD.decode(payload))
    }

    /// Whether this message signals a barge-in interruption.
    pub fn is_interrupted(&self) -> bool {
        self.server_content
            .as_ref()
            .and_then(|content| content.interrupted)
            .unwrap_or(false)
    }

    /// Whether this message marks the end of a model turn.
    pub fn is_turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .and_then(|content| content.turn_complete)
            .unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================
