//! Sample-accurate timing conversions for mono 16-bit PCM
//!
//! A staging queue's clock is its head time: the cumulative seconds of audio
//! already delivered to its sink. Internally head time is tracked as an exact
//! byte count so it can only advance in whole-sample steps; these helpers
//! convert between the three representations in play:
//!
//! 1. **Bytes**: u64 counts of delivered little-endian 16-bit samples
//! 2. **Samples**: whole samples at the queue's sample rate
//! 3. **Seconds**: f64 values exposed to schedulers and time-barrier futures
//!
//! All durations round to whole samples; a duration that rounds to zero or
//! negative samples converts to zero bytes.

/// Bytes per sample for mono 16-bit PCM
pub const BYTES_PER_SAMPLE: u64 = 2;

/// Convert a sample count to a byte count
pub fn samples_to_bytes(samples: u64) -> u64 {
    samples * BYTES_PER_SAMPLE
}

/// Convert a byte count to a whole-sample count (truncating)
pub fn bytes_to_samples(bytes: u64) -> u64 {
    bytes / BYTES_PER_SAMPLE
}

/// Convert a duration in seconds to a byte count at the given sample rate
///
/// Rounds to the nearest whole sample. Negative durations and durations that
/// round to zero samples yield zero bytes.
pub fn secs_to_bytes(secs: f64, sample_rate: u32) -> u64 {
    let samples = (secs * sample_rate as f64).round();
    if samples <= 0.0 {
        return 0;
    }
    samples_to_bytes(samples as u64)
}

/// Convert a byte count to seconds at the given sample rate
pub fn bytes_to_secs(bytes: u64, sample_rate: u32) -> f64 {
    bytes as f64 / BYTES_PER_SAMPLE as f64 / sample_rate as f64
}
