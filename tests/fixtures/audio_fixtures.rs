//! Audio Test Fixtures
//!
//! This module provides programmatically generated audio test data.
//! Using generated audio ensures:
//! - Consistent, reproducible test inputs
//! - No external file dependencies
//! - Precise control over signal characteristics
//!
//! Audio formats across the pipeline:
//! - Capture side: 16kHz mono f32 samples, sent as 16-bit PCM
//! - Playback side: 24kHz mono f32 samples decoded from the model stream

use std::f32::consts::PI;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Microphone sample rate (16kHz)
pub const CAPTURE_RATE: u32 = 16_000;

/// Model audio sample rate (24kHz)
pub const PLAYBACK_RATE: u32 = 24_000;

/// Samples per capture block
pub const BLOCK: usize = 4096;

/// One second of capture audio, in samples
pub const CAPTURE_SECOND: usize = 16_000;

/// One second of playback audio, in samples
pub const PLAYBACK_SECOND: usize = 24_000;

/// Generate silence (zeros)
pub fn generate_silence(duration_samples: usize) -> Vec<f32> {
    vec![0.0; duration_samples]
}

/// Generate a constant-value signal
pub fn generate_constant(duration_samples: usize, value: f32) -> Vec<f32> {
    vec![value; duration_samples]
}

/// Generate a sine wave tone at the given sample rate
pub fn generate_sine_wave(
    duration_samples: usize,
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
) -> Vec<f32> {
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;
    (0..duration_samples)
        .map(|i| (angular_freq * i as f32).sin() * amplitude)
        .collect()
}

/// Generate a 440Hz (A4) reference tone at capture rate
pub fn generate_a440_tone(duration_samples: usize) -> Vec<f32> {
    generate_sine_wave(duration_samples, 440.0, 0.5, CAPTURE_RATE)
}

/// Playback samples covering the given duration at 24kHz
pub fn playback_samples_for_secs(secs: f64) -> Vec<f32> {
    generate_silence((secs * PLAYBACK_RATE as f64).round() as usize)
}

/// Convert f32 samples to 16-bit little-endian PCM bytes
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| {
            let clamped = s.clamp(-1.0, 1.0);
            ((clamped * 32767.0) as i16).to_le_bytes()
        })
        .collect()
}

/// Convert 16-bit little-endian PCM bytes back to f32 samples
pub fn pcm16_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| f32::from(i16::from_le_bytes([chunk[0], chunk[1]])) / 32768.0)
        .collect()
}

/// Calculate RMS (root mean square) amplitude
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Calculate peak amplitude
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

// ============================================================================
// Wire message fixtures
// ============================================================================

/// Server setup acknowledgement
pub fn setup_complete_json() -> String {
    r#"{"setupComplete":{}}"#.to_string()
}

/// Server audio chunk carrying the given 24kHz samples
pub fn server_audio_json(samples: &[f32]) -> String {
    let data = STANDARD.encode(samples_to_pcm16(samples));
    format!(
        r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{data}"}}}}]}}}}}}"#
    )
}

/// Server barge-in notification
pub fn interrupted_json() -> String {
    r#"{"serverContent":{"interrupted":true}}"#.to_string()
}

/// Server end-of-turn marker
pub fn turn_complete_json() -> String {
    r#"{"serverContent":{"turnComplete":true}}"#.to_string()
}

/// Extract and decode the PCM payload from an outbound realtime input frame.
///
/// Returns `None` when the JSON does not have the expected shape.
pub fn decode_realtime_input(json: &str) -> Option<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let chunk = value.get("realtimeInput")?.get("mediaChunks")?.get(0)?;
    assert_eq!(
        chunk.get("mimeType")?.as_str()?,
        "audio/pcm;rate=16000",
        "outbound chunk must declare the capture format"
    );
    let data = chunk.get("data")?.as_str()?;
    STANDARD.decode(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_generation() {
        let silence = generate_silence(CAPTURE_SECOND);
        assert_eq!(silence.len(), CAPTURE_SECOND);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sine_wave_generation() {
        let sine = generate_sine_wave(CAPTURE_SECOND, 440.0, 0.5, CAPTURE_RATE);
        assert_eq!(sine.len(), CAPTURE_SECOND);

        // Peak should reach the requested amplitude
        let peak = calculate_peak(&sine);
        assert!(peak > 0.45 && peak <= 0.5);
    }

    #[test]
    fn test_pcm16_conversion_round_trip() {
        let samples = vec![0.0, 0.5, -0.5, 0.999, -1.0];
        let bytes = samples_to_pcm16(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);

        let recovered = pcm16_to_samples(&bytes);
        for (original, restored) in samples.iter().zip(recovered.iter()) {
            assert!((original - restored).abs() < 0.001);
        }
    }

    #[test]
    fn test_server_audio_json_shape() {
        let json = server_audio_json(&generate_constant(10, 0.25));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let data = value["serverContent"]["modelTurn"]["parts"][0]["inlineData"]["data"]
            .as_str()
            .unwrap();
        assert!(!data.is_empty());
    }

    #[test]
    fn test_decode_realtime_input_rejects_other_shapes() {
        assert!(decode_realtime_input(r#"{"setup":{}}"#).is_none());
        assert!(decode_realtime_input("not json").is_none());
    }
}
