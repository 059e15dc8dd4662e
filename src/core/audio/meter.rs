//! Volume metering for the UI level indicator.
//!
//! [`VolumeMeter`] turns a block of samples into a normalized level in
//! [0.0, 1.0]: root-mean-square, scaled by a fixed gain so conversational
//! speech registers visibly, clamped at 1.0. The value drives a cosmetic
//! indicator, not any audio decision.
//!
//! [`SharedLevel`] is the single cell both the capture path and the playback
//! path write their latest level into; the UI snapshot reads it lock-free.

use std::sync::atomic::{AtomicU32, Ordering};

/// Empirical gain applied to the RMS so normal speech reaches the upper
/// portion of the meter.
pub const DEFAULT_METER_GAIN: f32 = 5.0;

/// Pure RMS level computation with a fixed display gain.
#[derive(Debug, Clone, Copy)]
pub struct VolumeMeter {
    gain: f32,
}

impl Default for VolumeMeter {
    fn default() -> Self {
        Self {
            gain: DEFAULT_METER_GAIN,
        }
    }
}

impl VolumeMeter {
    /// Create a meter with a custom gain.
    pub fn with_gain(gain: f32) -> Self {
        Self { gain }
    }

    /// Compute the normalized level of a sample block.
    ///
    /// Returns 0.0 for an empty block. Deterministic and side-effect free.
    pub fn level(&self, block: &[f32]) -> f32 {
        if block.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = block.iter().map(|s| s * s).sum();
        let rms = (sum_squares / block.len() as f32).sqrt();
        (rms * self.gain).min(1.0)
    }
}

/// Lock-free cell holding the most recent level from either audio direction.
///
/// Capture metering and playback metering both write here; last writer wins,
/// which matches a single UI indicator fed from both directions. The level is
/// reset to 0.0 on session teardown.
#[derive(Debug, Default)]
pub struct SharedLevel(AtomicU32);

impl SharedLevel {
    /// Create a cell starting at 0.0.
    pub fn new() -> Self {
        Self(AtomicU32::new(0.0f32.to_bits()))
    }

    /// Store a new level.
    pub fn set(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }

    /// Read the most recent level.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Reset the level to 0.0.
    pub fn reset(&self) {
        self.set(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        let meter = VolumeMeter::default();
        assert_eq!(meter.level(&[0.0; 1024]), 0.0);
    }

    #[test]
    fn test_empty_block_is_zero() {
        let meter = VolumeMeter::default();
        assert_eq!(meter.level(&[]), 0.0);
    }

    #[test]
    fn test_full_scale_clamps_to_one() {
        let meter = VolumeMeter::default();
        assert_eq!(meter.level(&[1.0; 256]), 1.0);
        assert_eq!(meter.level(&[-1.0; 256]), 1.0);
    }

    #[test]
    fn test_sine_level() {
        // RMS of a sine with amplitude 0.1 is 0.1/sqrt(2); gain 5 gives ~0.354
        let meter = VolumeMeter::default();
        let block: Vec<f32> = (0..1600)
            .map(|i| 0.1 * (2.0 * std::f32::consts::PI * i as f32 / 40.0).sin())
            .collect();
        let level = meter.level(&block);
        assert!((level - 0.3536).abs() < 0.01, "level was {level}");
    }

    #[test]
    fn test_level_is_deterministic() {
        let meter = VolumeMeter::default();
        let block: Vec<f32> = (0..512).map(|i| (i as f32 * 0.02).sin() * 0.3).collect();
        assert_eq!(meter.level(&block), meter.level(&block));
    }

    #[test]
    fn test_custom_gain() {
        let meter = VolumeMeter::with_gain(1.0);
        let level = meter.level(&[0.5; 128]);
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shared_level_set_get() {
        let cell = SharedLevel::new();
        assert_eq!(cell.get(), 0.0);
        cell.set(0.75);
        assert_eq!(cell.get(), 0.75);
        cell.reset();
        assert_eq!(cell.get(), 0.0);
    }
}
