//! # Chorale Staging Engine (chorale-stager)
//!
//! Pull-driven audio sample producer with multi-device synchronization.
//!
//! **Purpose:** Assemble heterogeneous audio content (raw samples, nested
//! streams, silence, deferred holds) ahead of playback time, expose precise
//! scheduling hooks, and align several independent output devices so content
//! becomes audible at the same wall-clock instant.
//!
//! **Architecture:** One `StagingQueue` per output device, each drained by
//! its own task into an application-supplied `AudioSink`; `Synchronizer`
//! coordinates hold/resolve exchanges across queues; `ClockOffsetEstimator`
//! learns each device's playback-offset correction.

pub mod error;
pub mod staging;
pub mod sync;

pub use error::{Error, Result};
pub use staging::queue::{HoldResolver, StagingQueue, TimeFuture};
pub use staging::sink::AudioSink;
pub use staging::source::SampleSource;
pub use sync::align::{sync, SyncPoint, Synchronizer};
pub use sync::clock::{autosync, ClockOffsetEstimator, TimestampChannel};
