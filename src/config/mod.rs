//! Application configuration.
//!
//! Everything is loaded from environment variables; a `.env` file (if
//! present) is read at startup in `main.rs`. Priority order (highest to
//! lowest):
//! 1. Command-line flags
//! 2. Environment variables (actual ENV vars override `.env` values)
//! 3. Built-in defaults
//!
//! # Example
//! ```rust,no_run
//! use vocero::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! println!("model: {}, voice: {}", config.model, config.voice);
//! # Ok(())
//! # }
//! ```

use std::env;

use thiserror::Error;

use crate::core::channel::{GeminiChannelConfig, GeminiModel, GeminiVoice};

/// Persona sent at session setup when `VOCERO_INSTRUCTIONS` is not set.
///
/// Kept short on purpose: long personas push the model toward long spoken
/// answers, which feel wrong in a live voice exchange.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly voice assistant. \
     Speak in a warm, fluid, conversational tone. Keep answers very short \
     and direct, suited to spoken conversation.";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The required API key is absent or blank
    #[error("GEMINI_API_KEY is not set (get a key at https://aistudio.google.com/apikey)")]
    MissingApiKey,
}

/// Application configuration
///
/// Holds the Gemini credentials plus the session parameters the voice
/// pipeline is started with.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key (`GEMINI_API_KEY`)
    pub api_key: String,
    /// Live model to connect to (`VOCERO_MODEL`)
    pub model: GeminiModel,
    /// Voice for synthesized speech (`VOCERO_VOICE`)
    pub voice: GeminiVoice,
    /// Persona instruction sent at setup (`VOCERO_INSTRUCTIONS`)
    pub instructions: String,
}

/// Zeroize the API key when the config is dropped so the secret does not
/// linger in freed memory.
impl Drop for AppConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.api_key.zeroize();
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; everything else falls back to a
    /// default. Unknown model or voice names fall back leniently rather
    /// than failing, matching [`GeminiModel::from_str_or_default`].
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingApiKey`] when `GEMINI_API_KEY` is
    /// unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = env::var("VOCERO_MODEL")
            .map(|value| GeminiModel::from_str_or_default(&value))
            .unwrap_or_default();

        let voice = env::var("VOCERO_VOICE")
            .map(|value| GeminiVoice::from_str_or_default(&value))
            .unwrap_or_default();

        let instructions =
            env::var("VOCERO_INSTRUCTIONS").unwrap_or_else(|_| DEFAULT_INSTRUCTIONS.to_string());

        Ok(Self {
            api_key,
            model,
            voice,
            instructions,
        })
    }

    /// Build the channel configuration for one session.
    pub fn channel_config(&self) -> GeminiChannelConfig {
        let mut config = GeminiChannelConfig::new(self.api_key.clone());
        config.model = self.model;
        config.voice = self.voice;
        config.instructions = Some(self.instructions.clone());
        config
    }
}
