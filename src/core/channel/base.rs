//! Base trait and types for duplex voice channels.
//!
//! A duplex channel is the bidirectional transport to a conversational voice
//! endpoint: the client streams microphone PCM up and receives synthesized
//! speech chunks and control signals (interruption, turn completion, close)
//! back through registered callbacks.
//!
//! # Audio Format
//!
//! Outbound audio is PCM 16-bit signed little-endian at 16 kHz; inbound audio
//! payloads decode to the same encoding at 24 kHz.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on a duplex channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection to the endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect-time negotiation failed
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Connection dropped unexpectedly after setup
    #[error("Transport dropped: {0}")]
    TransportDropped(String),

    /// An outbound frame could not be delivered
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// An inbound payload could not be decoded
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

// =============================================================================
// Callback Types
// =============================================================================

/// Callback for inbound audio chunks (raw PCM16LE bytes at 24 kHz).
pub type AudioCallback =
    Arc<dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for server-initiated interruption (barge-in).
pub type InterruptedCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for remote/transport closure. Carries the close reason if the
/// transport provided one. Not invoked for an intentional local `close()`.
pub type ClosedCallback =
    Arc<dyn Fn(Option<String>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for channel errors.
pub type ErrorCallback =
    Arc<dyn Fn(ChannelError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Base Trait
// =============================================================================

/// Bidirectional voice transport to a conversational endpoint.
///
/// # Lifecycle
///
/// Register callbacks, then `connect()`. Once connected, `send_audio_frame`
/// streams microphone PCM up while inbound events fire the callbacks. Always
/// finish with `close()`: transport resources must not rely on being dropped
/// implicitly.
///
/// # Example
///
/// ```rust,ignore
/// use vocero::core::channel::{DuplexChannel, GeminiLiveChannel, GeminiChannelConfig};
///
/// let mut channel = GeminiLiveChannel::new(GeminiChannelConfig::new(api_key))?;
/// channel.on_audio(Arc::new(|pcm| Box::pin(async move {
///     // decode and schedule for playback
/// })))?;
/// channel.connect().await?;
/// channel.send_audio_frame(frame).await?;
/// channel.close().await?;
/// ```
#[async_trait]
pub trait DuplexChannel: Send + Sync {
    /// Connect and complete the setup negotiation.
    async fn connect(&mut self) -> ChannelResult<()>;

    /// Close the channel intentionally. Idempotent; suppresses the
    /// closed-callback.
    async fn close(&mut self) -> ChannelResult<()>;

    /// Whether the channel is connected and ready for audio.
    fn is_connected(&self) -> bool;

    /// Send one outbound audio frame (PCM16LE at 16 kHz).
    async fn send_audio_frame(&mut self, pcm: Bytes) -> ChannelResult<()>;

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Register a callback for inbound audio chunks.
    fn on_audio(&mut self, callback: AudioCallback) -> ChannelResult<()>;

    /// Register a callback for interruption signals.
    fn on_interrupted(&mut self, callback: InterruptedCallback) -> ChannelResult<()>;

    /// Register a callback for remote closure.
    fn on_closed(&mut self, callback: ClosedCallback) -> ChannelResult<()>;

    /// Register a callback for channel errors.
    fn on_error(&mut self, callback: ErrorCallback) -> ChannelResult<()>;
}

/// Boxed trait object for duplex channels.
pub type BoxedDuplexChannel = Box<dyn DuplexChannel>;
