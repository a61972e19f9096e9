//! Mono 16-bit PCM waveforms and sample conversion.
//!
//! Pure functions — no I/O, no async runtime.

use std::time::Duration;

/// Sample rate of the speech backend's output (24 kHz mono).
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Pause inserted between consecutive spoken lines.
pub const INTER_SEGMENT_SILENCE_MS: u32 = 500;

/// Convert normalized float samples (`[-1, 1]`) to 16-bit PCM.
///
/// Linear scaling with rounding: `round(sample * 32767)`. Out-of-range input
/// is clamped so the conversion never wraps.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

/// Inverse of [`f32_to_i16`]: map 16-bit PCM back to normalized floats.
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| (s as f32 / i16::MAX as f32).max(-1.0))
        .collect()
}

/// A single-channel 16-bit waveform at a fixed sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Waveform {
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a waveform from normalized float samples.
    pub fn from_normalized(samples: &[f32], sample_rate: u32) -> Self {
        Self::from_samples(f32_to_i16(samples), sample_rate)
    }

    /// All-zero waveform lasting `duration_ms`.
    pub fn silence(duration_ms: u32, sample_rate: u32) -> Self {
        let len = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::from_samples(vec![0; len], sample_rate)
    }

    /// Append `other` to the end of this waveform.
    ///
    /// Both must share a sample rate; the speech pipeline only ever produces
    /// one rate so a mismatch is a programming error.
    pub fn append(&mut self, other: &Waveform) {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        self.samples.extend_from_slice(&other.samples);
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}
