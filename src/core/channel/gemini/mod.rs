//! Gemini Live API module.
//!
//! This module provides the duplex voice channel over Google's Gemini Live
//! (BidiGenerateContent) WebSocket API.
//!
//! # Features
//!
//! - Bidirectional audio streaming with a native-audio model
//! - Server-side barge-in signaling (interruption)
//! - Named prebuilt voices and a connect-time persona instruction
//!
//! # Supported Models
//!
//! - `gemini-2.5-flash-native-audio-preview-09-2025` - native audio (default)
//! - `gemini-2.0-flash-live-001` - Flash Live
//! - `gemini-live-2.5-flash-preview` - 2.5 Flash Live preview
//!
//! # Supported Voices
//!
//! Kore, Puck, Charon, Fenrir, Aoede, Leda, Orus, Zephyr
//!
//! # Audio Format
//!
//! Input is PCM 16-bit signed little-endian at 16kHz; output is the same
//! encoding at 24kHz. Both travel base64-encoded inside JSON frames.

mod client;
mod config;
mod messages;

pub use client::GeminiLiveChannel;
pub use config::{
    GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiChannelConfig, GeminiModel, GeminiVoice,
    INPUT_AUDIO_MIME,
};
pub use messages::{ClientMessage, Content, InlineData, MediaBlob, Part, ServerMessage};
