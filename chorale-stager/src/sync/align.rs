//! Cross-queue alignment
//!
//! Given N (queue, content, target-offset) points, reserves a splice point on
//! every queue, waits for all of their scheduled times, then pads each queue
//! with exactly enough silence that all N contents become audible at the same
//! instant on the shared virtual timeline. The participant needing the least
//! padding is the alignment anchor and receives none.
//!
//! Alignment is all-or-nothing: if one queue's scheduled time never resolves
//! (the queue is stalled), the whole batch waits with it.

use std::sync::Arc;

use chorale_common::events::ChoraleEvent;
use chorale_common::EventBus;
use futures::future::try_join_all;
use tracing::debug;

use crate::staging::queue::StagingQueue;
use crate::staging::source::SampleSource;
use crate::{Error, Result};

/// One participant in a synchronization batch
#[derive(Debug)]
pub struct SyncPoint {
    /// Queue to schedule on
    pub queue: StagingQueue,
    /// Content that should sound at `target_offset`
    pub source: SampleSource,
    /// Requested position on the virtual timeline, in seconds relative to
    /// this queue's own clock (any per-device clock-offset correction is
    /// already folded in by the caller)
    pub target_offset: f64,
}

/// Aligns content across independent staging queues
#[derive(Debug, Default)]
pub struct Synchronizer {
    events: Option<Arc<EventBus>>,
}

impl Synchronizer {
    /// Create a synchronizer with no event reporting
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a synchronizer that emits ChoraleEvents on `events`
    pub fn with_events(events: Arc<EventBus>) -> Self {
        Self {
            events: Some(events),
        }
    }

    /// Schedule all points so their contents begin sounding together
    ///
    /// Returns the anchor's scheduled start time (the instant, on the
    /// anchor queue's clock, at which the whole batch becomes audible).
    ///
    /// For each point the padding inserted ahead of its source is
    /// `(target_offset - start) - min(target_offset - start)` across the
    /// batch; the minimum-offset point gets exactly zero.
    pub async fn sync(&self, points: Vec<SyncPoint>) -> Result<f64> {
        if points.is_empty() {
            return Err(Error::Sync("sync requires at least one point".to_string()));
        }

        // Reserve every splice point first; no queue blocks another
        let mut starts = Vec::with_capacity(points.len());
        let mut resolvers = Vec::with_capacity(points.len());
        for point in &points {
            let (start, resolver) = point.queue.hold();
            starts.push(start);
            resolvers.push(resolver);
        }

        let starts = try_join_all(starts).await?;

        let offsets: Vec<f64> = points
            .iter()
            .zip(&starts)
            .map(|(point, start)| point.target_offset - start)
            .collect();

        let (anchor, min_offset) = offsets
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (index, &offset)| {
                if offset < best.1 {
                    (index, offset)
                } else {
                    best
                }
            });
        let anchor_start = starts[anchor];
        let participants = points.len();

        debug!(
            "Aligning {} queues, anchor {} starting at {:.4}s",
            participants, anchor, anchor_start
        );

        for ((point, resolver), offset) in points.into_iter().zip(resolvers).zip(offsets) {
            resolver.resolve(vec![
                SampleSource::Silence(offset - min_offset),
                point.source,
            ]);
        }

        if let Some(bus) = &self.events {
            bus.emit_lossy(ChoraleEvent::SyncScheduled {
                participants,
                anchor_start_secs: anchor_start,
                timestamp: chrono::Utc::now(),
            });
        }

        Ok(anchor_start)
    }
}

/// Align a batch of points with a default [`Synchronizer`]
pub async fn sync(points: Vec<SyncPoint>) -> Result<f64> {
    Synchronizer::new().sync(points).await
}
