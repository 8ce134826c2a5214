//! Staging queue, content sources, and the sink contract

pub mod queue;
pub mod sink;
pub mod source;

pub use queue::{HoldResolver, StagingQueue, TimeFuture};
pub use sink::AudioSink;
pub use source::SampleSource;
