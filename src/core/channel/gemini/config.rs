//! Gemini Live API configuration types.
//!
//! This module contains configuration for the Gemini Live bidirectional
//! streaming API:
//! - Model selection
//! - Voice selection
//! - Channel configuration (endpoint, key, persona instructions)

use serde::{Deserialize, Serialize};

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// MIME type for outbound microphone audio.
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// Sample rate of audio returned by the Live API, in Hz.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

// =============================================================================
// Models
// =============================================================================

/// Supported Gemini Live models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash with native audio (default)
    #[default]
    #[serde(rename = "gemini-2.5-flash-native-audio-preview-09-2025")]
    Flash25NativeAudio,
    /// Gemini 2.0 Flash Live
    #[serde(rename = "gemini-2.0-flash-live-001")]
    FlashLive20,
    /// Gemini Live 2.5 Flash preview
    #[serde(rename = "gemini-live-2.5-flash-preview")]
    FlashLive25Preview,
}

impl GeminiModel {
    /// Convert to the API model identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash25NativeAudio => "gemini-2.5-flash-native-audio-preview-09-2025",
            Self::FlashLive20 => "gemini-2.0-flash-live-001",
            Self::FlashLive25Preview => "gemini-live-2.5-flash-preview",
        }
    }

    /// Fully qualified resource name used in the setup message.
    pub fn resource_name(&self) -> String {
        format!("models/{}", self.as_str())
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gemini-2.5-flash-native-audio-preview-09-2025" => Self::Flash25NativeAudio,
            "gemini-2.0-flash-live-001" => Self::FlashLive20,
            "gemini-live-2.5-flash-preview" => Self::FlashLive25Preview,
            _ => Self::default(),
        }
    }

    /// Get all supported models.
    pub fn all() -> &'static [GeminiModel] {
        &[
            Self::Flash25NativeAudio,
            Self::FlashLive20,
            Self::FlashLive25Preview,
        ]
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Prebuilt voices available on the Gemini Live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiVoice {
    /// Kore voice (default)
    #[default]
    Kore,
    /// Puck voice
    Puck,
    /// Charon voice
    Charon,
    /// Fenrir voice
    Fenrir,
    /// Aoede voice
    Aoede,
    /// Leda voice
    Leda,
    /// Orus voice
    Orus,
    /// Zephyr voice
    Zephyr,
}

impl GeminiVoice {
    /// Convert to the API voice name.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Fenrir => "Fenrir",
            Self::Aoede => "Aoede",
            Self::Leda => "Leda",
            Self::Orus => "Orus",
            Self::Zephyr => "Zephyr",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "kore" => Self::Kore,
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "fenrir" => Self::Fenrir,
            "aoede" => Self::Aoede,
            "leda" => Self::Leda,
            "orus" => Self::Orus,
            "zephyr" => Self::Zephyr,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [GeminiVoice] {
        &[
            Self::Kore,
            Self::Puck,
            Self::Charon,
            Self::Fenrir,
            Self::Aoede,
            Self::Leda,
            Self::Orus,
            Self::Zephyr,
        ]
    }
}

impl std::fmt::Display for GeminiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Channel Configuration
// =============================================================================

/// Configuration for a Gemini Live duplex channel.
#[derive(Debug, Clone)]
pub struct GeminiChannelConfig {
    /// WebSocket endpoint. Overridable for tests.
    pub url: String,

    /// API key, appended as the `key` query parameter.
    pub api_key: String,

    /// Model to connect to.
    pub model: GeminiModel,

    /// Voice for synthesized speech.
    pub voice: GeminiVoice,

    /// Persona instruction sent at setup, if any.
    pub instructions: Option<String>,
}

impl GeminiChannelConfig {
    /// Create a config for the production endpoint with default model and
    /// voice.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: GEMINI_LIVE_URL.to_string(),
            api_key: api_key.into(),
            model: GeminiModel::default(),
            voice: GeminiVoice::default(),
            instructions: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
