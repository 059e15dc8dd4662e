//! Gemini Live API client implementation.
//!
//! This module provides the Gemini Live client that implements the
//! `DuplexChannel` trait over the BidiGenerateContent WebSocket API.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<api_key>`
//! - Protocol: WebSocket with JSON messages (Text or Binary frames)
//! - Audio in: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded
//! - Audio out: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded
//!
//! # Example
//!
//! ```rust,ignore
//! use vocero::core::channel::{DuplexChannel, GeminiChannelConfig, GeminiLiveChannel};
//! use std::sync::Arc;
//!
//! let mut channel = GeminiLiveChannel::new(GeminiChannelConfig::new("AIza..."))?;
//!
//! channel.on_audio(Arc::new(|pcm| Box::pin(async move {
//!     // 24kHz PCM16LE chunk
//! })))?;
//!
//! channel.connect().await?;
//! channel.send_audio_frame(frame).await?;
//! channel.close().await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::config::GeminiChannelConfig;
use super::messages::{ClientMessage, ServerMessage};
use crate::core::channel::base::{
    AudioCallback, ChannelError, ChannelResult, ClosedCallback, DuplexChannel, ErrorCallback,
    InterruptedCallback,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the server's setup acknowledgment.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long close() waits for the socket task to finish the close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Gemini Live Client
// =============================================================================

/// Gemini Live API client implementation.
///
/// Streams microphone PCM up and dispatches synthesized speech, interruption,
/// closure, and error events to registered callbacks.
///
/// # Thread Safety
///
/// All mutable state is behind `Arc` wrappers so it can be shared with the
/// spawned socket task. The `connected` flag uses `Arc<AtomicBool>` for
/// lock-free status checks.
pub struct GeminiLiveChannel {
    /// Configuration
    config: GeminiChannelConfig,
    /// Connected flag (shared with the socket task)
    connected: Arc<AtomicBool>,
    /// Local close was requested; suppresses the closed-callback
    intentional_close: Arc<AtomicBool>,

    /// WebSocket sender channel
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,

    /// Callbacks
    audio_callback: Arc<Mutex<Option<AudioCallback>>>,
    interrupted_callback: Arc<Mutex<Option<InterruptedCallback>>>,
    closed_callback: Arc<Mutex<Option<ClosedCallback>>>,
    error_callback: Arc<Mutex<Option<ErrorCallback>>>,

    /// Socket task handle
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl GeminiLiveChannel {
    /// Create a new client from configuration.
    pub fn new(config: GeminiChannelConfig) -> ChannelResult<Self> {
        if config.api_key.is_empty() {
            return Err(ChannelError::InvalidConfig("API key is empty".to_string()));
        }

        Ok(Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            intentional_close: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            audio_callback: Arc::new(Mutex::new(None)),
            interrupted_callback: Arc::new(Mutex::new(None)),
            closed_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            task_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Build the endpoint URL with the API key appended.
    fn build_ws_url(&self) -> ChannelResult<String> {
        let mut url = url::Url::parse(&self.config.url)
            .map_err(|e| ChannelError::InvalidConfig(format!("invalid endpoint URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url.into())
    }

    /// Parse a server frame and dispatch it to the registered callbacks.
    ///
    /// Interruption is handled before audio so that a message carrying both
    /// schedules its audio against the reset clock.
    async fn handle_server_message(
        message: ServerMessage,
        audio_cb: &Arc<Mutex<Option<AudioCallback>>>,
        interrupted_cb: &Arc<Mutex<Option<InterruptedCallback>>>,
    ) {
        if message.is_interrupted() {
            tracing::debug!("server signaled interruption");
            if let Some(cb) = interrupted_cb.lock().await.as_ref() {
                cb().await;
            }
        }

        if let Some(decoded) = message.decode_audio() {
            match decoded {
                Ok(pcm) => {
                    if let Some(cb) = audio_cb.lock().await.as_ref() {
                        cb(Bytes::from(pcm)).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropping undecodable audio chunk: {}", e);
                }
            }
        }

        if message.is_turn_complete() {
            tracing::trace!("model turn complete");
        }
    }

    /// Parse raw frame text as a server message, tolerating unknown kinds.
    fn parse_frame(raw: &[u8]) -> Option<ServerMessage> {
        match serde_json::from_slice::<ServerMessage>(raw) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!("Failed to parse server message: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl DuplexChannel for GeminiLiveChannel {
    async fn connect(&mut self) -> ChannelResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Reset the intentional close flag from any previous session
        self.intentional_close.store(false, Ordering::SeqCst);

        let url = self.build_ws_url()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("Connected to Gemini Live endpoint");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        // First frame on the socket must be setup; audio may not flow until
        // the server acknowledges with setupComplete.
        let setup_json = serde_json::to_string(&ClientMessage::setup(&self.config))?;
        ws_sink
            .send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| ChannelError::HandshakeFailed(e.to_string()))?;

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Some(parsed) = Self::parse_frame(text.as_bytes()) {
                            if parsed.is_setup_complete() {
                                return Ok(());
                            }
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        if let Some(parsed) = Self::parse_frame(&data) {
                            if parsed.is_setup_complete() {
                                return Ok(());
                            }
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "no reason given".to_string());
                        return Err(ChannelError::HandshakeFailed(format!(
                            "closed during setup: {reason}"
                        )));
                    }
                    Err(e) => {
                        return Err(ChannelError::HandshakeFailed(e.to_string()));
                    }
                    _ => {}
                }
            }
            Err(ChannelError::HandshakeFailed(
                "socket ended before setup acknowledgment".to_string(),
            ))
        })
        .await;

        match handshake {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(ChannelError::HandshakeFailed(format!(
                    "no setup acknowledgment within {}s",
                    HANDSHAKE_TIMEOUT.as_secs()
                )));
            }
        }

        tracing::info!(
            model = %self.config.model,
            voice = %self.config.voice,
            "Gemini Live session established"
        );

        // Create channel for sending messages
        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        // Clone references for the socket task
        let audio_cb = self.audio_callback.clone();
        let interrupted_cb = self.interrupted_callback.clone();
        let closed_cb = self.closed_callback.clone();
        let error_cb = self.error_callback.clone();
        let ws_sender = self.ws_sender.clone();
        let connected = self.connected.clone();
        let intentional_close = self.intentional_close.clone();

        // Mark as connected before spawning the task
        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Handle outgoing messages
                    outbound = rx.recv() => {
                        let Some(message) = outbound else {
                            // sender cleared; close() is tearing us down
                            break;
                        };
                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            if !intentional_close.load(Ordering::SeqCst) {
                                if let Some(cb) = error_cb.lock().await.as_ref() {
                                    cb(ChannelError::TransportDropped(e.to_string())).await;
                                }
                            }
                            break;
                        }
                    }

                    // Handle incoming messages
                    inbound = ws_stream.next() => {
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(message) = Self::parse_frame(text.as_bytes()) {
                                    Self::handle_server_message(
                                        message,
                                        &audio_cb,
                                        &interrupted_cb,
                                    ).await;
                                }
                            }
                            Some(Ok(Message::Binary(data))) => {
                                if let Some(message) = Self::parse_frame(&data) {
                                    Self::handle_server_message(
                                        message,
                                        &audio_cb,
                                        &interrupted_cb,
                                    ).await;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                let reason = frame.map(|f| f.reason.to_string());
                                tracing::info!(?reason, "WebSocket closed by server");
                                if !intentional_close.load(Ordering::SeqCst) {
                                    if let Some(cb) = closed_cb.lock().await.as_ref() {
                                        cb(reason).await;
                                    }
                                }
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                if !intentional_close.load(Ordering::SeqCst) {
                                    if let Some(cb) = error_cb.lock().await.as_ref() {
                                        cb(ChannelError::TransportDropped(e.to_string())).await;
                                    }
                                }
                                break;
                            }
                            Some(Ok(_)) => {}
                            None => {
                                // stream ended without a close frame
                                if !intentional_close.load(Ordering::SeqCst) {
                                    if let Some(cb) = closed_cb.lock().await.as_ref() {
                                        cb(None).await;
                                    }
                                }
                                break;
                            }
                        }
                    }
                }
            }

            // Close the write half so the peer sees a close frame instead of
            // a dead TCP connection. Fails harmlessly when the transport is
            // already gone.
            if let Err(e) = ws_sink.close().await {
                tracing::trace!("websocket close handshake: {}", e);
            }

            // Final cleanup - clear sender and mark disconnected
            *ws_sender.lock().await = None;
            connected.store(false, Ordering::SeqCst);
            tracing::debug!("Gemini Live socket task finished");
        });

        *self.task_handle.lock().await = Some(handle);

        Ok(())
    }

    async fn close(&mut self) -> ChannelResult<()> {
        self.intentional_close.store(true, Ordering::SeqCst);

        // Dropping the sender ends the socket task's select loop; the task
        // then runs the close handshake on its way out.
        *self.ws_sender.lock().await = None;

        if let Some(mut handle) = self.task_handle.lock().await.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("socket task did not close in time, aborting");
                handle.abort();
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!("Gemini Live channel closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_audio_frame(&mut self, pcm: Bytes) -> ChannelResult<()> {
        let sender = self.ws_sender.lock().await;
        match sender.as_ref() {
            Some(tx) => tx
                .try_send(ClientMessage::audio_chunk(&pcm))
                .map_err(|e| ChannelError::SendFailed(e.to_string())),
            None => Err(ChannelError::NotConnected),
        }
    }

    fn on_audio(&mut self, callback: AudioCallback) -> ChannelResult<()> {
        if let Ok(mut guard) = self.audio_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb_ref = self.audio_callback.clone();
            tokio::spawn(async move {
                *cb_ref.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_interrupted(&mut self, callback: InterruptedCallback) -> ChannelResult<()> {
        if let Ok(mut guard) = self.interrupted_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb_ref = self.interrupted_callback.clone();
            tokio::spawn(async move {
                *cb_ref.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_closed(&mut self, callback: ClosedCallback) -> ChannelResult<()> {
        if let Ok(mut guard) = self.closed_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb_ref = self.closed_callback.clone();
            tokio::spawn(async move {
                *cb_ref.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_error(&mut self, callback: ErrorCallback) -> ChannelResult<()> {
        if let Ok(mut guard) = self.error_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb_ref = self.error_callback.clone();
            tokio::spawn(async move {
                *cb_ref.lock().await = Some(callback);
            });
        }
        Ok(())
    }
}
