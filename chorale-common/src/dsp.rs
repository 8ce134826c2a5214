//! Tone generation and float quantization
//!
//! The staging engine produces mono 16-bit little-endian PCM. Float sample
//! sequences (from tone generation or decoded audio) are quantized here on
//! their way into a queue; the clock-offset estimator uses the sine generator
//! for its detection chirp.

use crate::timing::BYTES_PER_SAMPLE;
use std::f64::consts::TAU;

/// Quantize float samples in [-1, 1] to mono 16-bit little-endian PCM
///
/// Values outside the range are clamped before scaling.
pub fn quantize_floats(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * BYTES_PER_SAMPLE as usize);
    for value in values {
        let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16;
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Generate a unit-amplitude sine wave
///
/// Returns `seconds * sample_rate` samples (rounded to a whole sample count)
/// at the given frequency.
pub fn sine_wave(sample_rate: u32, frequency: f64, seconds: f64) -> Vec<f64> {
    let count = (seconds * sample_rate as f64).round().max(0.0) as usize;
    let step = TAU * frequency / sample_rate as f64;
    (0..count).map(|i| (step * i as f64).sin()).collect()
}

/// Scale samples in place by a constant gain
pub fn scale(samples: &mut [f64], gain: f64) {
    for sample in samples {
        *sample *= gain;
    }
}
