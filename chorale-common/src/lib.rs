//! # Chorale Common Library
//!
//! Shared code for the Chorale staging engine:
//! - Error types
//! - Staging configuration (sample rate, chunk sizing, watchdog interval)
//! - Event types (ChoraleEvent enum) and EventBus
//! - Sample/byte/seconds timing conversions
//! - Tone generation and float quantization
//! - Speaker geometry (beamforming amplitudes)
//! - Timestamp channel message shapes

pub mod config;
pub mod dsp;
pub mod error;
pub mod events;
pub mod geometry;
pub mod protocol;
pub mod timing;

pub use config::StagerConfig;
pub use error::{Error, Result};
pub use events::{ChoraleEvent, EventBus};
