//! Microphone capture path: meter, mute gate, outbound encoding.
//!
//! Device blocks flow through a bounded channel into a single pump task.
//! Every block is metered regardless of mute state, so the UI level keeps
//! moving while muted; only unmuted blocks are encoded and forwarded for
//! transmission. Forwarding is fire-and-forget: when the outbound queue is
//! full or gone the frame is dropped, never retried, and the capture loop is
//! never blocked. For live audio a late frame is worth less than no frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::AudioBlock;
use super::meter::{SharedLevel, VolumeMeter};
use super::pcm::encode_pcm16;

/// Per-block capture processing: metering, mute gating, PCM16LE encoding.
pub struct CaptureEngine {
    meter: VolumeMeter,
    muted: Arc<AtomicBool>,
    level: Arc<SharedLevel>,
}

impl CaptureEngine {
    /// Create an engine sharing the session's mute flag and level cell.
    pub fn new(muted: Arc<AtomicBool>, level: Arc<SharedLevel>) -> Self {
        Self {
            meter: VolumeMeter::default(),
            muted,
            level,
        }
    }

    /// Toggle the transmit gate. Takes effect from the next block.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Current state of the transmit gate.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Process one capture block.
    ///
    /// Publishes the block's level, then returns the transmit-ready frame,
    /// or `None` when muted.
    pub fn process_block(&self, block: &[f32]) -> Option<Bytes> {
        self.level.set(self.meter.level(block));
        if self.is_muted() {
            return None;
        }
        Some(encode_pcm16(block))
    }

    /// Spawn the pump task draining device blocks into the outbound queue.
    ///
    /// Runs until the block sender is dropped (the input path stopped).
    pub fn spawn_pump(
        self: Arc<Self>,
        mut blocks: mpsc::Receiver<AudioBlock>,
        frames: mpsc::Sender<Bytes>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("capture pump started");
            while let Some(block) = blocks.recv().await {
                if let Some(frame) = self.process_block(&block) {
                    if let Err(err) = frames.try_send(frame) {
                        debug!("outbound frame dropped: {}", err);
                    }
                }
            }
            debug!("capture pump stopped");
        })
    }
}
