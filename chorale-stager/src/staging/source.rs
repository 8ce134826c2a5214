//! Content sources accepted by a staging queue

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// A piece of audio content that can be enqueued on a `StagingQueue`
///
/// All audio is mono 16-bit little-endian PCM at the queue's sample rate.
#[derive(Debug)]
pub enum SampleSource {
    /// Pre-encoded PCM samples
    Buffer(Bytes),

    /// Float samples in [-1, 1], quantized to PCM on enqueue
    ///
    /// Out-of-range values are clamped before scaling.
    Floats(Vec<f64>),

    /// Silence of the given duration in seconds
    ///
    /// Materialized lazily in fixed-size zero chunks. Durations that round
    /// to zero samples (including negative ones) are no-ops.
    Silence(f64),

    /// A live external chunk source, consumed incrementally
    ///
    /// The queue receives chunks only while its sink has capacity, so the
    /// sender side naturally sees the sink's backpressure. The source ends
    /// when the sender is dropped.
    Stream(mpsc::Receiver<Bytes>),

    /// Content not yet known, spliced in at this position once resolved
    ///
    /// A hold never produces audio itself. Dropping the sender without
    /// resolving permanently stalls the queue at this point; that is the
    /// documented caller responsibility, not a recoverable fault.
    Hold(oneshot::Receiver<Vec<SampleSource>>),
}

impl SampleSource {
    /// Build a buffer source from raw PCM bytes
    pub fn buffer(data: impl Into<Bytes>) -> Self {
        SampleSource::Buffer(data.into())
    }

    /// Build a silence source from a duration in seconds
    pub fn silence(seconds: f64) -> Self {
        SampleSource::Silence(seconds)
    }
}
