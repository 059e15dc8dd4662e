//! PCM sample conversion helpers.
//!
//! The transport carries PCM 16-bit signed little-endian audio, base64-encoded
//! inside JSON frames. Internally the pipeline works on `f32` samples in
//! [-1.0, 1.0]. This module converts between the two, downmixes interleaved
//! device frames to mono, and resamples device-rate audio to the pipeline
//! rates with a streaming linear resampler.

use base64::prelude::*;
use bytes::Bytes;
use thiserror::Error;

/// Errors raised while decoding transport audio payloads.
#[derive(Debug, Error)]
pub enum PcmError {
    /// Base64 payload could not be decoded
    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Byte stream does not split into whole 16-bit samples
    #[error("PCM16 payload has odd length: {0} bytes")]
    OddLength(usize),
}

/// Encode `f32` samples to PCM 16-bit little-endian bytes.
///
/// Samples are clamped to [-1.0, 1.0] before scaling so out-of-range input
/// saturates instead of wrapping.
pub fn encode_pcm16(samples: &[f32]) -> Bytes {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Bytes::from(out)
}

/// Decode PCM 16-bit little-endian bytes to `f32` samples in [-1.0, 1.0].
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, PcmError> {
    if bytes.len() % 2 != 0 {
        return Err(PcmError::OddLength(bytes.len()));
    }
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        samples.push(value as f32 / 32768.0);
    }
    Ok(samples)
}

/// Base64-encode raw PCM bytes for JSON transport.
pub fn encode_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

/// Decode a base64 transport payload into raw PCM bytes.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, PcmError> {
    Ok(BASE64_STANDARD.decode(data)?)
}

/// Decode a base64 transport payload straight to `f32` samples.
pub fn decode_base64_pcm16(data: &str) -> Result<Vec<f32>, PcmError> {
    decode_pcm16(&decode_base64(data)?)
}

/// Downmix interleaved multi-channel frames to mono by averaging.
///
/// A `channels` of 0 or 1 returns the input unchanged.
pub fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let mut mono = Vec::with_capacity(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        let sum: f32 = frame.iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

/// Streaming linear-interpolation resampler.
///
/// Feed arbitrary-length mono blocks with [`push`](Self::push); output is
/// appended to the caller's buffer. Holds one sample of history across calls
/// so block boundaries interpolate correctly.
#[derive(Debug)]
pub struct StreamResampler {
    src_rate: u32,
    dst_rate: u32,
    // fractional read position into `buf`
    pos: f64,
    buf: Vec<f32>,
}

impl StreamResampler {
    /// Create a resampler from `src_rate` Hz to `dst_rate` Hz.
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        Self {
            src_rate,
            dst_rate,
            pos: 0.0,
            buf: Vec::new(),
        }
    }

    /// True when input and output rates match and samples pass through.
    pub fn is_passthrough(&self) -> bool {
        self.src_rate == self.dst_rate
    }

    /// Feed a block of source samples, appending resampled output to `out`.
    pub fn push(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if self.is_passthrough() {
            out.extend_from_slice(input);
            return;
        }
        self.buf.extend_from_slice(input);

        let step = self.src_rate as f64 / self.dst_rate as f64;
        // need pos+1 for interpolation, so stop one sample short of the end
        while self.buf.len() >= 2 && self.pos + 1.0 < self.buf.len() as f64 {
            let idx = self.pos as usize;
            let frac = (self.pos - idx as f64) as f32;
            let sample = self.buf[idx] * (1.0 - frac) + self.buf[idx + 1] * frac;
            out.push(sample);
            self.pos += step;
        }

        // drop fully consumed history, keeping one sample of lookback
        let consumed = (self.pos as usize).saturating_sub(1);
        if consumed > 0 {
            self.buf.drain(..consumed);
            self.pos -= consumed as f64;
        }
    }
}

/// Resample a complete mono buffer in one shot.
pub fn resample(input: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || input.is_empty() {
        return input.to_vec();
    }
    let mut resampler = StreamResampler::new(src_rate, dst_rate);
    let mut out = Vec::with_capacity(input.len() * dst_rate as usize / src_rate as usize + 1);
    resampler.push(input, &mut out);
    out
}
