//! Downstream sink contract
//!
//! The staging engine produces bytes; the application supplies the conduit
//! (encoder, HTTP response body, device transport) as an `AudioSink`. The
//! engine only requires that the sink accept a continuous byte stream and
//! exert backpressure.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A byte sink fed by a staging queue's drain task
///
/// `accept` always consumes the chunk; returning `false` signals
/// backpressure and the queue pauses delivery until `ready` resolves.
/// Backpressure is not an error — `Err` from either method means the
/// transport itself failed, and stops the queue's drain task.
#[async_trait]
pub trait AudioSink: Send + 'static {
    /// Hand the sink a chunk of PCM bytes
    ///
    /// Returns `true` if the sink wants more data immediately, `false` if
    /// the queue should pause until [`ready`](AudioSink::ready) resolves.
    async fn accept(&mut self, chunk: Bytes) -> Result<bool>;

    /// Resolves when a backpressured sink wants more data
    async fn ready(&mut self) -> Result<()>;
}
