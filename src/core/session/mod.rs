//! Voice session lifecycle: state machine, snapshots, errors.
//!
//! A session is the span between a successful `connect()` and teardown. The
//! [`SessionController`] owns at most one live session at a time and drives
//! the `Disconnected -> Connecting -> Connected -> {Disconnected | Error}`
//! state machine; the UI observes it through read-only [`SessionSnapshot`]s
//! rather than shared mutable state.

use serde::Serialize;
use thiserror::Error;

use crate::core::audio::AudioPathError;
use crate::core::channel::ChannelError;

mod controller;

pub use controller::{ChannelFactory, SessionController};

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of the voice session.
///
/// `Error` is terminal except that a fresh `connect()` transitions it back
/// to `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No session
    #[default]
    Disconnected,
    /// Session setup in progress
    Connecting,
    /// Live duplex audio
    Connected,
    /// Session failed; requires a fresh connect()
    Error,
}

impl ConnectionState {
    /// Lowercase name as exposed in snapshots.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read-only view of the session for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current connection state
    pub connection_state: ConnectionState,
    /// Whether the microphone transmit gate is closed
    pub is_muted: bool,
    /// Latest level from either audio direction, in [0.0, 1.0]
    pub volume_level: f32,
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by session lifecycle operations.
///
/// Per-block and per-chunk faults (undecodable chunks, undeliverable frames)
/// are logged and recovered locally; they never become a `SessionError`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// connect() while a session is already connecting or connected
    #[error("Session already active")]
    AlreadyActive,

    /// Microphone access refused or unavailable
    #[error("Microphone unavailable: {0}")]
    PermissionDenied(String),

    /// Speaker output could not be opened
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// Channel connect or setup negotiation failed
    #[error("Channel handshake failed: {0}")]
    HandshakeFailure(#[from] ChannelError),
}

impl From<AudioPathError> for SessionError {
    fn from(err: AudioPathError) -> Self {
        match err {
            AudioPathError::InputUnavailable(msg) => SessionError::PermissionDenied(msg),
            AudioPathError::OutputUnavailable(msg) => SessionError::OutputUnavailable(msg),
        }
    }
}
