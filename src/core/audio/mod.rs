//! Audio pipeline: capture, metering, PCM conversion, playback scheduling.
//!
//! The pipeline runs at two fixed rates. The microphone side captures mono
//! PCM at 16 kHz in 4096-sample blocks; the playback side renders mono PCM
//! at 24 kHz. Device-rate conversion happens at the edges (see
//! [`pcm::StreamResampler`]), everything in between works on these fixed
//! formats.
//!
//! Hardware access sits behind [`AudioBackend`] so the whole pipeline runs
//! against in-memory fakes in tests. The real backend
//! ([`device::CpalBackend`]) is compiled in with the `device-audio` feature.
//!
//! # Modules
//!
//! - [`pcm`] - PCM16LE encode/decode, base64, downmixing, resampling
//! - [`meter`] - RMS volume metering and the shared UI level cell
//! - [`capture`] - microphone block processing and the outbound pump
//! - [`playback`] - gapless scheduling of inbound speech chunks

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

pub mod capture;
#[cfg(feature = "device-audio")]
pub mod device;
pub mod meter;
pub mod pcm;
pub mod playback;

pub use capture::CaptureEngine;
pub use meter::{SharedLevel, VolumeMeter};
pub use playback::{OutputSink, PlaybackScheduler, Scheduled, SourceId};

/// Sample rate of captured microphone audio, in Hz.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Samples per captured block.
pub const CAPTURE_BLOCK_SAMPLES: usize = 4096;

/// Sample rate of synthesized speech received for playback, in Hz.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// One mono block of `f32` samples at the capture rate.
pub type AudioBlock = Vec<f32>;

/// Errors opening the hardware audio paths.
#[derive(Debug, Error)]
pub enum AudioPathError {
    /// Microphone could not be opened
    #[error("Audio input unavailable: {0}")]
    InputUnavailable(String),

    /// Speaker output could not be opened
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Handle to a running input path. Dropping it stops capture.
pub trait InputHandle: Send {
    /// Stop capture and release the device. Idempotent.
    fn stop(&mut self);
}

/// Factory for the two hardware audio paths.
///
/// `open_input` starts delivering [`CAPTURE_BLOCK_SAMPLES`]-sample mono
/// blocks at [`CAPTURE_SAMPLE_RATE`] into `blocks` until the returned handle
/// is stopped or dropped. `open_output` returns the rendering sink for the
/// playback scheduler.
pub trait AudioBackend: Send + Sync {
    /// Open the microphone path.
    fn open_input(
        &self,
        blocks: mpsc::Sender<AudioBlock>,
    ) -> Result<Box<dyn InputHandle>, AudioPathError>;

    /// Open the speaker path.
    ///
    /// The sink meters its rendered output into `level`, so the UI level
    /// tracks assistant speech as well as the microphone. Both writers share
    /// the cell; the most recent write wins.
    fn open_output(&self, level: Arc<SharedLevel>)
    -> Result<Arc<dyn OutputSink>, AudioPathError>;
}
