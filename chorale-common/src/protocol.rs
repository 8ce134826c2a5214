//! Timestamp channel message shapes
//!
//! The clock-offset estimation protocol exchanges two small messages with
//! each remote device, over whatever transport the application provides.
//! Both carry an opaque session id; each id is used for exactly one round
//! trip.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server → device: prepare to detect a tone at the given frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Session id, echoed back in the matching TimestampReport
    pub id: Uuid,
    /// Detection frequency in Hz
    pub frequency: f64,
}

/// Device → server: observed arrival timestamp of the detected tone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestampReport {
    /// Session id from the DetectRequest this report answers
    pub id: Uuid,
    /// Observed timestamp on the device's own clock (seconds)
    pub timestamp: f64,
}
