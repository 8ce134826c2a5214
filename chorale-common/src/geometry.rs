//! Speaker geometry for three-device beamforming
//!
//! Computes per-speaker amplitudes so a unit-amplitude sound appears to
//! originate at a virtual position around the listener. The fixed layout:
//!
//! - Speaker 1: `X` units to the left, `Y_FRONT` units in front
//! - Speaker 2: `X` units to the right, `Y_FRONT` units in front
//! - Speaker 3: `Y_BACK` units directly behind
//!
//! The plane is divided into three bearing sectors; in each sector the pair
//! of speakers straddling the source direction is driven, weighted by an
//! inverse-cube distance falloff.

use once_cell::sync::Lazy;
use std::f64::consts::{PI, TAU};

/// Number of speakers in the layout
pub const SPEAKER_COUNT: usize = 3;

/// Horizontal distance from the listener to each front speaker
pub const X: f64 = 1.0;

/// Forward distance from the listener to the front speaker pair
pub const Y_FRONT: f64 = 0.8;

/// Rearward distance from the listener to the back speaker
pub const Y_BACK: f64 = 1.5;

/// Distance from the listener to each front speaker
static D_FRONT: Lazy<f64> = Lazy::new(|| (X * X + Y_FRONT * Y_FRONT).sqrt());

/// Bearing of the right front speaker: switchover between rear-right and front sectors
static THETA_FRONT_RIGHT: Lazy<f64> = Lazy::new(|| Y_FRONT.atan2(X));

/// Bearing of the left front speaker: switchover between front and rear-left sectors
static THETA_FRONT_LEFT: Lazy<f64> = Lazy::new(|| PI - *THETA_FRONT_RIGHT);

/// Straight behind, left side: switchover between rear-left and rear-right sectors
const THETA_REAR: f64 = 3.0 * PI / 2.0;

/// Per-speaker amplitudes for a unit-amplitude sound at `(x0, y0)`
///
/// Returns `[left-front, right-front, back]` gains. The listener sits at the
/// origin facing +y.
pub fn amplitudes(x0: f64, y0: f64) -> [f64; SPEAKER_COUNT] {
    let d0 = (x0 * x0 + y0 * y0).sqrt();

    // Normalize the bearing into one revolution starting at the right
    // front speaker, so each sector is a contiguous range.
    let mut theta = y0.atan2(x0);
    while theta < *THETA_FRONT_RIGHT {
        theta += TAU;
    }

    let d_ratio = (*D_FRONT / d0).powi(3);

    if theta < *THETA_FRONT_LEFT {
        // Front sector: drive the front pair, panned by x position
        let a1 = 0.5 * d_ratio * ((y0 / Y_FRONT) - (x0 / X));
        let a2 = 0.5 * d_ratio * ((y0 / Y_FRONT) + (x0 / X));
        [a1, a2, 0.0]
    } else if theta < THETA_REAR {
        // Rear-left sector: left front speaker and the back speaker
        let a1 = d_ratio * (-(x0 / X));
        let a3 = Y_BACK * Y_BACK * ((a1 * Y_FRONT) / D_FRONT.powi(3) - y0 / d0.powi(3));
        [a1, 0.0, a3]
    } else {
        // Rear-right sector: right front speaker and the back speaker
        let a2 = d_ratio * (x0 / X);
        let a3 = Y_BACK * Y_BACK * ((a2 * Y_FRONT) / D_FRONT.powi(3) - y0 / d0.powi(3));
        [0.0, a2, a3]
    }
}
