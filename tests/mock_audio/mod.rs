//! Mock Audio and Channel Infrastructure
//!
//! In-memory stand-ins for the hardware audio backend and the live voice
//! channel. Session tests drive the full pipeline through these: synthetic
//! microphone blocks go in, outbound frames and playback scheduling come out,
//! with no device and no network.

// Allow dead code in test infrastructure - not every suite uses every mock
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use vocero::core::audio::{
    AudioBackend, AudioBlock, AudioPathError, InputHandle, OutputSink, SharedLevel, SourceId,
};
use vocero::core::channel::{
    AudioCallback, BoxedDuplexChannel, ChannelError, ChannelResult, ClosedCallback, DuplexChannel,
    ErrorCallback, GeminiChannelConfig, InterruptedCallback,
};
use vocero::core::session::{ChannelFactory, ConnectionState, SessionController};

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    true
}

/// Poll the controller until it reaches `want` or `timeout` elapses.
pub async fn wait_for_state(
    controller: &SessionController,
    want: ConnectionState,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if controller.connection_state().await == want {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Output sink
// =============================================================================

/// One recorded `schedule()` call.
pub struct ScheduledCall {
    pub id: SourceId,
    pub samples: Vec<f32>,
    pub start_at: f64,
}

/// Output sink fake with a manually driven clock.
///
/// Records every schedule/stop call so tests can assert on the exact
/// placement the scheduler chose.
#[derive(Default)]
pub struct RecordingSink {
    clock: Mutex<f64>,
    pub scheduled: Mutex<Vec<ScheduledCall>>,
    pub stopped: Mutex<Vec<SourceId>>,
    finished: Mutex<Vec<SourceId>>,
    pub shutdowns: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the output clock to an absolute position.
    pub fn set_clock(&self, t: f64) {
        *self.clock.lock() = t;
    }

    /// Report a source as finished on the next `drain_finished()`.
    pub fn finish(&self, id: SourceId) {
        self.finished.lock().push(id);
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().len()
    }

    pub fn stopped_count(&self) -> usize {
        self.stopped.lock().len()
    }
}

impl OutputSink for RecordingSink {
    fn clock(&self) -> f64 {
        *self.clock.lock()
    }

    fn schedule(&self, id: SourceId, samples: Vec<f32>, start_at: f64) {
        self.scheduled.lock().push(ScheduledCall {
            id,
            samples,
            start_at,
        });
    }

    fn stop(&self, id: SourceId) {
        self.stopped.lock().push(id);
    }

    fn drain_finished(&self) -> Vec<SourceId> {
        std::mem::take(&mut self.finished.lock())
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Audio backend
// =============================================================================

/// Microphone handle fake; `stop()` drops the block sender so the capture
/// pump drains and exits, the way a joined device thread would.
pub struct MockInputHandle {
    stopped: Arc<AtomicBool>,
    block_tx: Arc<Mutex<Option<mpsc::Sender<AudioBlock>>>>,
}

impl InputHandle for MockInputHandle {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        *self.block_tx.lock() = None;
    }
}

/// Audio backend fake backed by a [`RecordingSink`].
///
/// Tests feed microphone audio with [`MockBackend::send_block`] and flip the
/// `fail_*` switches to simulate missing hardware.
pub struct MockBackend {
    pub sink: Arc<RecordingSink>,
    pub fail_input: AtomicBool,
    pub fail_output: AtomicBool,
    pub input_opens: AtomicUsize,
    pub output_opens: AtomicUsize,
    input_stopped: Arc<AtomicBool>,
    block_tx: Arc<Mutex<Option<mpsc::Sender<AudioBlock>>>>,
    output_level: Mutex<Option<Arc<SharedLevel>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(RecordingSink::new()),
            fail_input: AtomicBool::new(false),
            fail_output: AtomicBool::new(false),
            input_opens: AtomicUsize::new(0),
            output_opens: AtomicUsize::new(0),
            input_stopped: Arc::new(AtomicBool::new(false)),
            block_tx: Arc::new(Mutex::new(None)),
            output_level: Mutex::new(None),
        }
    }

    /// Feed one block of microphone samples into the live session.
    ///
    /// Returns false when no session holds the input open.
    pub async fn send_block(&self, block: AudioBlock) -> bool {
        let tx = { self.block_tx.lock().clone() };
        match tx {
            Some(tx) => tx.send(block).await.is_ok(),
            None => false,
        }
    }

    /// Whether the last opened microphone handle was stopped.
    pub fn input_stopped(&self) -> bool {
        self.input_stopped.load(Ordering::SeqCst)
    }

    /// The level cell handed to the most recent `open_output`.
    pub fn output_level(&self) -> Option<Arc<SharedLevel>> {
        self.output_level.lock().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for MockBackend {
    fn open_input(
        &self,
        blocks: mpsc::Sender<AudioBlock>,
    ) -> Result<Box<dyn InputHandle>, AudioPathError> {
        if self.fail_input.load(Ordering::SeqCst) {
            return Err(AudioPathError::InputUnavailable(
                "mock microphone permission denied".to_string(),
            ));
        }
        self.input_opens.fetch_add(1, Ordering::SeqCst);
        self.input_stopped.store(false, Ordering::SeqCst);
        *self.block_tx.lock() = Some(blocks);
        Ok(Box::new(MockInputHandle {
            stopped: self.input_stopped.clone(),
            block_tx: self.block_tx.clone(),
        }))
    }

    fn open_output(
        &self,
        level: Arc<SharedLevel>,
    ) -> Result<Arc<dyn OutputSink>, AudioPathError> {
        if self.fail_output.load(Ordering::SeqCst) {
            return Err(AudioPathError::OutputUnavailable(
                "mock output device busy".to_string(),
            ));
        }
        self.output_opens.fetch_add(1, Ordering::SeqCst);
        *self.output_level.lock() = Some(level);
        Ok(self.sink.clone())
    }
}

// =============================================================================
// Duplex channel
// =============================================================================

/// Shared state of a [`MockChannel`]; the test keeps the `Arc` and uses it to
/// inspect outbound frames and to fire server-side events.
#[derive(Default)]
pub struct ChannelState {
    pub connected: AtomicBool,
    pub closed: AtomicBool,
    pub fail_connect: AtomicBool,
    pub hold_connect: AtomicBool,
    pub sent_frames: Mutex<Vec<Bytes>>,
    connect_gate: Notify,
    audio_cb: Mutex<Option<AudioCallback>>,
    interrupted_cb: Mutex<Option<InterruptedCallback>>,
    closed_cb: Mutex<Option<ClosedCallback>>,
    error_cb: Mutex<Option<ErrorCallback>>,
}

impl ChannelState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let a connect() held by `hold_connect` proceed.
    pub fn release_connect(&self) {
        self.connect_gate.notify_one();
    }

    pub fn sent_count(&self) -> usize {
        self.sent_frames.lock().len()
    }

    /// Deliver a synthesized speech chunk as the server would.
    pub async fn fire_audio(&self, pcm: Bytes) {
        let cb = self.audio_cb.lock().clone();
        if let Some(cb) = cb {
            cb(pcm).await;
        }
    }

    /// Deliver a barge-in notification.
    pub async fn fire_interrupted(&self) {
        let cb = self.interrupted_cb.lock().clone();
        if let Some(cb) = cb {
            cb().await;
        }
    }

    /// Deliver a remote close.
    pub async fn fire_closed(&self, reason: Option<String>) {
        let cb = self.closed_cb.lock().clone();
        if let Some(cb) = cb {
            cb(reason).await;
        }
    }

    /// Deliver a transport-level error.
    pub async fn fire_error(&self, err: ChannelError) {
        let cb = self.error_cb.lock().clone();
        if let Some(cb) = cb {
            cb(err).await;
        }
    }
}

/// Duplex channel fake writing through to a shared [`ChannelState`].
pub struct MockChannel {
    pub state: Arc<ChannelState>,
}

#[async_trait]
impl DuplexChannel for MockChannel {
    async fn connect(&mut self) -> ChannelResult<()> {
        if self.state.hold_connect.load(Ordering::SeqCst) {
            // stall mid-handshake until the test releases the gate
            self.state.connect_gate.notified().await;
        }
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(ChannelError::HandshakeFailed(
                "mock refused setup".to_string(),
            ));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> ChannelResult<()> {
        self.state.connected.store(false, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn send_audio_frame(&mut self, pcm: Bytes) -> ChannelResult<()> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.state.sent_frames.lock().push(pcm);
        Ok(())
    }

    fn on_audio(&mut self, callback: AudioCallback) -> ChannelResult<()> {
        *self.state.audio_cb.lock() = Some(callback);
        Ok(())
    }

    fn on_interrupted(&mut self, callback: InterruptedCallback) -> ChannelResult<()> {
        *self.state.interrupted_cb.lock() = Some(callback);
        Ok(())
    }

    fn on_closed(&mut self, callback: ClosedCallback) -> ChannelResult<()> {
        *self.state.closed_cb.lock() = Some(callback);
        Ok(())
    }

    fn on_error(&mut self, callback: ErrorCallback) -> ChannelResult<()> {
        *self.state.error_cb.lock() = Some(callback);
        Ok(())
    }
}

/// Factory producing channels bound to one shared [`ChannelState`].
pub fn mock_channel_factory(state: Arc<ChannelState>) -> ChannelFactory {
    Box::new(move |_config: &GeminiChannelConfig| {
        let channel: BoxedDuplexChannel = Box::new(MockChannel {
            state: state.clone(),
        });
        Ok(channel)
    })
}
