//! Multi-device synchronization: alignment and clock-offset estimation

pub mod align;
pub mod clock;

pub use align::{sync, SyncPoint, Synchronizer};
pub use clock::{autosync, ClockOffsetEstimator, TimestampChannel};
