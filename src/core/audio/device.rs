//! Hardware audio backend built on cpal.
//!
//! Both directions follow the same shape: the cpal stream is built and owned
//! by a dedicated OS thread (streams are not `Send` on every platform), a
//! std channel reports setup success back to the caller, and a second
//! channel keeps the thread parked until the path is stopped. Dropping the
//! handle or shutting the sink down unblocks the thread, which drops the
//! stream and releases the device.
//!
//! The input side delivers the device's native format and converts it here:
//! downmix to mono, resample to the capture rate, re-block to fixed blocks.
//! The output side is a small mixer keyed by source id, rendering at the
//! device rate with a frame-counter clock; chunks are resampled from the
//! playback rate when they are scheduled, not in the render callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::meter::{SharedLevel, VolumeMeter};
use super::pcm::{StreamResampler, downmix_mono, resample};
use super::playback::{OutputSink, SourceId};
use super::{
    AudioBackend, AudioBlock, AudioPathError, CAPTURE_BLOCK_SAMPLES, CAPTURE_SAMPLE_RATE,
    InputHandle, PLAYBACK_SAMPLE_RATE,
};

/// Hardware backend using the default cpal host and devices.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn open_input(
        &self,
        blocks: mpsc::Sender<AudioBlock>,
    ) -> Result<Box<dyn InputHandle>, AudioPathError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("vocero-capture".to_string())
            .spawn(move || input_thread(blocks, ready_tx, stop_rx))
            .map_err(|e| AudioPathError::InputUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalInputHandle {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioPathError::InputUnavailable(
                    "capture thread exited during setup".to_string(),
                ))
            }
        }
    }

    fn open_output(
        &self,
        level: Arc<SharedLevel>,
    ) -> Result<Arc<dyn OutputSink>, AudioPathError> {
        let shared = Arc::new(MixerShared {
            sources: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            frames_elapsed: AtomicU64::new(0),
            level,
            meter: VolumeMeter::default(),
        });

        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name("vocero-playback".to_string())
            .spawn(move || output_thread(thread_shared, ready_tx, stop_rx))
            .map_err(|e| AudioPathError::OutputUnavailable(e.to_string()))?;

        let device_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioPathError::OutputUnavailable(
                    "playback thread exited during setup".to_string(),
                ));
            }
        };

        Ok(Arc::new(MixerSink {
            shared,
            device_rate,
            stop_tx: Mutex::new(Some(stop_tx)),
            thread: Mutex::new(Some(thread)),
        }))
    }
}

// =============================================================================
// Input Path
// =============================================================================

/// Handle keeping the capture thread (and with it the cpal stream) alive.
struct CpalInputHandle {
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl InputHandle for CpalInputHandle {
    fn stop(&mut self) {
        // dropping the sender unblocks the thread's recv()
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalInputHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn input_thread(
    blocks: mpsc::Sender<AudioBlock>,
    ready_tx: std_mpsc::Sender<Result<(), AudioPathError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_input_stream(blocks) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioPathError::InputUnavailable(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Park until the handle stops us; the stream lives on this thread
    let _ = stop_rx.recv();
    debug!("capture thread stopping");
}

fn build_input_stream(blocks: mpsc::Sender<AudioBlock>) -> Result<cpal::Stream, AudioPathError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioPathError::InputUnavailable("no input device".to_string()))?;
    let supported = device
        .default_input_config()
        .map_err(|e| AudioPathError::InputUnavailable(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let device_rate = config.sample_rate.0;

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        rate = device_rate,
        channels,
        format = %sample_format,
        "opening microphone"
    );

    let mut chunker = InputChunker::new(device_rate, channels, blocks);
    let err_fn = |err: cpal::StreamError| error!("input stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| chunker.push(data),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                chunker.push(&floats);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioPathError::InputUnavailable(format!(
                "unsupported input sample format: {other}"
            )));
        }
    }
    .map_err(|e| AudioPathError::InputUnavailable(e.to_string()))?;

    Ok(stream)
}

/// Converts device-format callbacks into fixed capture blocks.
///
/// The device callback must never block, so a full queue drops the block.
struct InputChunker {
    channels: usize,
    resampler: StreamResampler,
    resampled: Vec<f32>,
    pending: Vec<f32>,
    blocks: mpsc::Sender<AudioBlock>,
}

impl InputChunker {
    fn new(device_rate: u32, channels: usize, blocks: mpsc::Sender<AudioBlock>) -> Self {
        Self {
            channels,
            resampler: StreamResampler::new(device_rate, CAPTURE_SAMPLE_RATE),
            resampled: Vec::new(),
            pending: Vec::with_capacity(CAPTURE_BLOCK_SAMPLES),
            blocks,
        }
    }

    fn push(&mut self, interleaved: &[f32]) {
        let mono = downmix_mono(interleaved, self.channels);

        self.resampled.clear();
        self.resampler.push(&mono, &mut self.resampled);

        for &sample in &self.resampled {
            self.pending.push(sample);
            if self.pending.len() == CAPTURE_BLOCK_SAMPLES {
                let block = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(CAPTURE_BLOCK_SAMPLES),
                );
                let _ = self.blocks.try_send(block);
            }
        }
    }
}

// =============================================================================
// Output Path
// =============================================================================

/// One scheduled chunk, held at the device rate.
struct ActiveSource {
    id: SourceId,
    samples: Vec<f32>,
    start_frame: u64,
}

/// State shared between the sink handle and the render callback.
struct MixerShared {
    sources: Mutex<Vec<ActiveSource>>,
    finished: Mutex<Vec<SourceId>>,
    frames_elapsed: AtomicU64,
    level: Arc<SharedLevel>,
    meter: VolumeMeter,
}

/// Speaker sink mixing scheduled sources at the device rate.
struct MixerSink {
    shared: Arc<MixerShared>,
    device_rate: u32,
    stop_tx: Mutex<Option<std_mpsc::Sender<()>>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl OutputSink for MixerSink {
    fn clock(&self) -> f64 {
        self.shared.frames_elapsed.load(Ordering::Relaxed) as f64 / f64::from(self.device_rate)
    }

    fn schedule(&self, id: SourceId, samples: Vec<f32>, start_at: f64) {
        let samples = resample(&samples, PLAYBACK_SAMPLE_RATE, self.device_rate);
        let start_frame = (start_at * f64::from(self.device_rate)).round() as u64;
        self.shared.sources.lock().push(ActiveSource {
            id,
            samples,
            start_frame,
        });
    }

    fn stop(&self, id: SourceId) {
        self.shared.sources.lock().retain(|source| source.id != id);
    }

    fn drain_finished(&self) -> Vec<SourceId> {
        std::mem::take(&mut *self.shared.finished.lock())
    }

    fn shutdown(&self) {
        self.shared.sources.lock().clear();
        // dropping the sender unblocks the thread's recv()
        self.stop_tx.lock().take();
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MixerSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn output_thread(
    shared: Arc<MixerShared>,
    ready_tx: std_mpsc::Sender<Result<u32, AudioPathError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let (stream, device_rate) = match build_output_stream(shared) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioPathError::OutputUnavailable(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(device_rate));

    let _ = stop_rx.recv();
    debug!("playback thread stopping");
}

fn build_output_stream(
    shared: Arc<MixerShared>,
) -> Result<(cpal::Stream, u32), AudioPathError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioPathError::OutputUnavailable("no output device".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioPathError::OutputUnavailable(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let device_rate = config.sample_rate.0;

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        rate = device_rate,
        channels,
        format = %sample_format,
        "opening speaker"
    );

    let err_fn = |err: cpal::StreamError| error!("output stream error: {}", err);
    let mut mix: Vec<f32> = Vec::new();
    let mut done: Vec<SourceId> = Vec::new();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                render_mix(&shared, &mut mix, &mut done, frames);
                for (frame_out, &sample) in data.chunks_mut(channels).zip(mix.iter()) {
                    for out in frame_out.iter_mut() {
                        *out = sample;
                    }
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                render_mix(&shared, &mut mix, &mut done, frames);
                for (frame_out, &sample) in data.chunks_mut(channels).zip(mix.iter()) {
                    let value = (sample * 32767.0) as i16;
                    for out in frame_out.iter_mut() {
                        *out = value;
                    }
                }
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioPathError::OutputUnavailable(format!(
                "unsupported output sample format: {other}"
            )));
        }
    }
    .map_err(|e| AudioPathError::OutputUnavailable(e.to_string()))?;

    Ok((stream, device_rate))
}

/// Render one callback's worth of mono output into `mix`.
///
/// Sums every audible source over the frame window, clamps, records sources
/// that ended, meters the result, and advances the frame clock. Callbacks
/// with no audible source leave the level cell to the capture meter.
fn render_mix(shared: &MixerShared, mix: &mut Vec<f32>, done: &mut Vec<SourceId>, frames: usize) {
    let frame_base = shared.frames_elapsed.load(Ordering::Relaxed);
    let frame_end = frame_base + frames as u64;

    mix.clear();
    mix.resize(frames, 0.0);
    done.clear();

    let mut audible = false;
    {
        let mut sources = shared.sources.lock();
        sources.retain(|source| {
            let source_end = source.start_frame + source.samples.len() as u64;
            let begin = source.start_frame.max(frame_base);
            let stop = source_end.min(frame_end);
            if begin < stop {
                audible = true;
                for frame in begin..stop {
                    mix[(frame - frame_base) as usize] +=
                        source.samples[(frame - source.start_frame) as usize];
                }
            }
            if source_end <= frame_end {
                done.push(source.id);
                false
            } else {
                true
            }
        });
    }

    for sample in mix.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }

    if audible {
        shared.level.set(shared.meter.level(mix));
    }
    if !done.is_empty() {
        shared.finished.lock().append(done);
    }
    shared.frames_elapsed.fetch_add(frames as u64, Ordering::Relaxed);
}
