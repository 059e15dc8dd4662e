//! Session controller: owns the live session and drives its state machine.
//!
//! `connect()` wires the three halves together in order: speaker output,
//! microphone input, then the duplex channel. Inbound channel events route to
//! the playback scheduler; captured blocks flow through the capture pump into
//! the channel task. Every failure exit releases whatever was already opened
//! before the state settles, so no path leaks the microphone or the output
//! device.
//!
//! # Task Layout
//!
//! Two tasks per session, plus the channel's own socket task:
//! - capture pump: device blocks -> meter -> mute gate -> outbound frames
//! - channel task: owns the boxed channel; forwards frames, runs `close()`
//!
//! Remote close and channel errors tear the session down through the same
//! path as a local `disconnect()`, differing only in the final state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ConnectionState, SessionError, SessionSnapshot};
use crate::core::audio::pcm::decode_pcm16;
use crate::core::audio::{
    AudioBackend, CaptureEngine, InputHandle, OutputSink, PlaybackScheduler, SharedLevel,
};
use crate::core::channel::{
    BoxedDuplexChannel, ChannelError, ChannelResult, GeminiChannelConfig, GeminiLiveChannel,
};

/// Capacity of the device-block queue feeding the capture pump.
const BLOCK_QUEUE_CAPACITY: usize = 8;

/// Capacity of the outbound frame queue feeding the channel task.
const FRAME_QUEUE_CAPACITY: usize = 32;

/// Factory producing a duplex channel for each session.
pub type ChannelFactory =
    Box<dyn Fn(&GeminiChannelConfig) -> ChannelResult<BoxedDuplexChannel> + Send + Sync>;

/// Everything owned by one live session.
struct Session {
    id: Uuid,
    scheduler: Arc<PlaybackScheduler>,
    sink: Arc<dyn OutputSink>,
    mic: Box<dyn InputHandle>,
    close_tx: Option<oneshot::Sender<()>>,
    pump_handle: JoinHandle<()>,
    channel_handle: JoinHandle<()>,
}

/// Orchestrates the voice session lifecycle.
///
/// At most one session is live at a time; a `connect()` while one is
/// connecting or connected is rejected with [`SessionError::AlreadyActive`]
/// rather than queued. All shared state is behind `Arc` so the channel
/// callbacks and spawned tasks can reach it without referencing the
/// controller itself.
pub struct SessionController {
    channel_config: GeminiChannelConfig,
    backend: Arc<dyn AudioBackend>,
    channel_factory: ChannelFactory,
    state: Arc<RwLock<ConnectionState>>,
    muted: Arc<AtomicBool>,
    level: Arc<SharedLevel>,
    session: Arc<Mutex<Option<Session>>>,
}

impl SessionController {
    /// Create a controller connecting through the Gemini Live channel.
    pub fn new(channel_config: GeminiChannelConfig, backend: Arc<dyn AudioBackend>) -> Self {
        Self::with_channel_factory(
            channel_config,
            backend,
            Box::new(|config| Ok(Box::new(GeminiLiveChannel::new(config.clone())?))),
        )
    }

    /// Create a controller with a custom channel factory.
    pub fn with_channel_factory(
        channel_config: GeminiChannelConfig,
        backend: Arc<dyn AudioBackend>,
        channel_factory: ChannelFactory,
    ) -> Self {
        Self {
            channel_config,
            backend,
            channel_factory,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            muted: Arc::new(AtomicBool::new(false)),
            level: Arc::new(SharedLevel::new()),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a voice session.
    ///
    /// Fails with [`SessionError::AlreadyActive`] if a session is already
    /// connecting or connected. Any other failure releases the resources
    /// opened so far and leaves the state at `Error`.
    pub async fn connect(&self) -> Result<(), SessionError> {
        // Fast rejection without touching the session slot
        {
            let state = *self.state.read().await;
            if state == ConnectionState::Connecting || state == ConnectionState::Connected {
                return Err(SessionError::AlreadyActive);
            }
        }

        // The slot lock serializes lifecycle operations for the whole setup
        let mut session_slot = self.session.lock().await;
        if session_slot.is_some() {
            return Err(SessionError::AlreadyActive);
        }
        {
            let mut state = self.state.write().await;
            if *state == ConnectionState::Connecting || *state == ConnectionState::Connected {
                return Err(SessionError::AlreadyActive);
            }
            *state = ConnectionState::Connecting;
        }

        let session_id = Uuid::new_v4();
        info!(%session_id, "starting voice session");

        // Speaker output first; playback must be ready before audio arrives
        let sink = match self.backend.open_output(self.level.clone()) {
            Ok(sink) => sink,
            Err(e) => {
                error!(%session_id, "audio output unavailable: {}", e);
                *self.state.write().await = ConnectionState::Error;
                return Err(e.into());
            }
        };
        let scheduler = Arc::new(PlaybackScheduler::new(sink.clone()));

        // Microphone
        let (block_tx, block_rx) = mpsc::channel(BLOCK_QUEUE_CAPACITY);
        let mut mic = match self.backend.open_input(block_tx) {
            Ok(handle) => handle,
            Err(e) => {
                error!(%session_id, "microphone unavailable: {}", e);
                sink.shutdown();
                *self.state.write().await = ConnectionState::Error;
                return Err(e.into());
            }
        };

        // Duplex channel, wired before connecting so no early event is lost
        let channel_result = (self.channel_factory)(&self.channel_config).and_then(|mut channel| {
            self.wire_channel(&mut channel, &scheduler)?;
            Ok(channel)
        });
        let mut channel = match channel_result {
            Ok(channel) => channel,
            Err(e) => {
                error!(%session_id, "channel setup failed: {}", e);
                mic.stop();
                sink.shutdown();
                self.level.reset();
                *self.state.write().await = ConnectionState::Error;
                return Err(SessionError::HandshakeFailure(e));
            }
        };

        if let Err(e) = channel.connect().await {
            error!(%session_id, "channel handshake failed: {}", e);
            mic.stop();
            sink.shutdown();
            self.level.reset();
            *self.state.write().await = ConnectionState::Error;
            return Err(SessionError::HandshakeFailure(e));
        }

        // Capture pump: device blocks -> outbound frames
        let (frame_tx, mut frame_rx) = mpsc::channel::<Bytes>(FRAME_QUEUE_CAPACITY);
        let engine = Arc::new(CaptureEngine::new(self.muted.clone(), self.level.clone()));
        let pump_handle = engine.spawn_pump(block_rx, frame_tx);

        // Channel task: owns the channel, forwards frames, runs close()
        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let channel_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = frame_rx.recv() => {
                        match frame {
                            Some(pcm) => {
                                if let Err(e) = channel.send_audio_frame(pcm).await {
                                    // loss is cheaper than latency for live audio
                                    debug!("outbound frame not delivered: {}", e);
                                }
                            }
                            None => break,
                        }
                    }
                    _ = &mut close_rx => break,
                }
            }
            if let Err(e) = channel.close().await {
                debug!("channel close: {}", e);
            }
            debug!(%session_id, "channel task finished");
        });

        *session_slot = Some(Session {
            id: session_id,
            scheduler,
            sink,
            mic,
            close_tx: Some(close_tx),
            pump_handle,
            channel_handle,
        });
        *self.state.write().await = ConnectionState::Connected;
        info!(%session_id, "voice session connected");
        Ok(())
    }

    /// End the session and settle the state to `Disconnected`.
    ///
    /// Idempotent: calling it with no live session changes nothing beyond
    /// settling the state, and raises no error.
    pub async fn disconnect(&self) {
        let torn_down = Self::teardown(
            &self.session,
            &self.state,
            &self.level,
            ConnectionState::Disconnected,
        )
        .await;

        if !torn_down {
            let mut state = self.state.write().await;
            if *state != ConnectionState::Disconnected {
                debug!(previous = %*state, "disconnect with no live session");
                *state = ConnectionState::Disconnected;
            }
        }
    }

    /// Toggle the microphone transmit gate. Valid in any state.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Current state of the transmit gate.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Read-only snapshot for the UI.
    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_state: *self.state.read().await,
            is_muted: self.is_muted(),
            volume_level: self.level.get(),
        }
    }

    /// Register the channel callbacks for one session.
    fn wire_channel(
        &self,
        channel: &mut BoxedDuplexChannel,
        scheduler: &Arc<PlaybackScheduler>,
    ) -> ChannelResult<()> {
        let scheduler_audio = scheduler.clone();
        channel.on_audio(Arc::new(move |pcm: Bytes| {
            let scheduler = scheduler_audio.clone();
            Box::pin(async move {
                match decode_pcm16(&pcm) {
                    Ok(samples) => {
                        scheduler.enqueue(samples);
                    }
                    Err(e) => {
                        warn!("dropping undecodable playback chunk: {}", e);
                    }
                }
            })
        }))?;

        let scheduler_interrupt = scheduler.clone();
        channel.on_interrupted(Arc::new(move || {
            let scheduler = scheduler_interrupt.clone();
            Box::pin(async move {
                scheduler.interrupt();
            })
        }))?;

        // Remote close and channel errors run the same teardown as a local
        // disconnect. Spawned so the channel's own task can finish while the
        // teardown waits for it.
        let slot = self.session.clone();
        let state = self.state.clone();
        let level = self.level.clone();
        channel.on_closed(Arc::new(move |reason: Option<String>| {
            let slot = slot.clone();
            let state = state.clone();
            let level = level.clone();
            Box::pin(async move {
                warn!(?reason, "voice channel closed by remote");
                tokio::spawn(async move {
                    Self::teardown(&slot, &state, &level, ConnectionState::Disconnected).await;
                });
            })
        }))?;

        let slot = self.session.clone();
        let state = self.state.clone();
        let level = self.level.clone();
        channel.on_error(Arc::new(move |err: ChannelError| {
            let slot = slot.clone();
            let state = state.clone();
            let level = level.clone();
            Box::pin(async move {
                error!("voice channel error: {}", err);
                // A dropped transport ends the session like a remote close;
                // anything else is a fault the UI should surface
                let final_state = match err {
                    ChannelError::TransportDropped(_) => ConnectionState::Disconnected,
                    _ => ConnectionState::Error,
                };
                tokio::spawn(async move {
                    Self::teardown(&slot, &state, &level, final_state).await;
                });
            })
        }))?;

        Ok(())
    }

    /// Release every session resource and settle the state.
    ///
    /// Returns false when no session was live. Takes the pieces it touches
    /// instead of `&self` so channel callbacks can run it without holding a
    /// controller reference.
    async fn teardown(
        slot: &Mutex<Option<Session>>,
        state: &RwLock<ConnectionState>,
        level: &SharedLevel,
        final_state: ConnectionState,
    ) -> bool {
        let session = slot.lock().await.take();
        let Some(mut session) = session else {
            return false;
        };

        info!(session_id = %session.id, %final_state, "tearing down voice session");

        // Stop capture first so no new frame chases a closing channel
        session.mic.stop();
        if let Some(close_tx) = session.close_tx.take() {
            let _ = close_tx.send(());
        }
        if let Err(e) = session.pump_handle.await {
            debug!("capture pump join: {}", e);
        }
        if let Err(e) = session.channel_handle.await {
            debug!("channel task join: {}", e);
        }

        // Everything still scheduled is treated as interrupted
        session.scheduler.interrupt();
        session.sink.shutdown();
        level.reset();

        *state.write().await = final_state;
        true
    }
}
