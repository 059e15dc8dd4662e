//! Duplex voice channel module.
//!
//! This module provides the transport abstraction between the local audio
//! pipeline and a remote conversational voice endpoint.
//!
//! # Supported Providers
//!
//! - **Gemini Live** - Google's BidiGenerateContent API with native audio
//!
//! # Architecture
//!
//! - `DuplexChannel` trait for transport abstraction
//! - Factory function for provider creation by name
//! - Callback-based event handling (audio, interruption, closure, errors)
//!
//! # Example
//!
//! ```rust,ignore
//! use vocero::core::channel::{create_channel, GeminiChannelConfig};
//! use std::sync::Arc;
//!
//! let mut channel = create_channel("gemini", GeminiChannelConfig::new(api_key))?;
//! channel.on_audio(Arc::new(|pcm| Box::pin(async move {
//!     // schedule for playback
//! })))?;
//! channel.connect().await?;
//! ```

mod base;
pub mod gemini;

pub use base::{
    AudioCallback, BoxedDuplexChannel, ChannelError, ChannelResult, ClosedCallback, DuplexChannel,
    ErrorCallback, InterruptedCallback,
};
pub use gemini::{
    GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiChannelConfig, GeminiLiveChannel,
    GeminiModel, GeminiVoice, INPUT_AUDIO_MIME,
};

/// Supported channel providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProvider {
    /// Gemini Live API
    GeminiLive,
}

impl ChannelProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "gemini-live" | "gemini_live" => Some(ChannelProvider::GeminiLive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelProvider::GeminiLive => write!(f, "gemini"),
        }
    }
}

/// Factory function to create a duplex channel.
///
/// # Supported Providers
///
/// - `"gemini"` / `"gemini-live"` - Gemini Live API
pub fn create_channel(
    provider_type: &str,
    config: GeminiChannelConfig,
) -> ChannelResult<BoxedDuplexChannel> {
    match ChannelProvider::parse(provider_type) {
        Some(ChannelProvider::GeminiLive) => Ok(Box::new(GeminiLiveChannel::new(config)?)),
        None => Err(ChannelError::InvalidConfig(format!(
            "Unknown channel provider '{}'. Supported providers: {}",
            provider_type,
            get_supported_channel_providers().join(", ")
        ))),
    }
}

/// Get list of supported channel providers.
pub fn get_supported_channel_providers() -> Vec<&'static str> {
    vec!["gemini"]
}
