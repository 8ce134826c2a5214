//! Staging queue: pull-driven per-device sample producer
//!
//! A `StagingQueue` owns an ordered pending-content list and a monotonically
//! advancing head time (seconds of audio already delivered to its sink).
//! Appends are cheap and non-blocking; a dedicated drain task pulls entries
//! front-to-back and feeds the sink, pausing on backpressure, splicing
//! resolved holds in place, and injecting silence on underrun so the sink
//! never starves into end-of-stream.
//!
//! All pending-list mutation is serialized: append/hold/current_time take the
//! inner lock briefly, and the drain task never holds it across an await, so
//! no partial splice is ever visible.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use chorale_common::events::ChoraleEvent;
use chorale_common::{dsp, timing, EventBus, StagerConfig};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::staging::sink::AudioSink;
use crate::staging::source::SampleSource;
use crate::{Error, Result};

/// Future for the playback time (seconds) at which a queued item begins
///
/// Resolves immediately when created against an empty queue; otherwise
/// resolves when the queue head reaches the barrier. Errors only if the
/// queue is torn down first.
#[derive(Debug)]
pub struct TimeFuture(TimeFutureState);

#[derive(Debug)]
enum TimeFutureState {
    Ready(f64),
    Pending(oneshot::Receiver<f64>),
}

impl TimeFuture {
    fn ready(secs: f64) -> Self {
        TimeFuture(TimeFutureState::Ready(secs))
    }

    fn pending(rx: oneshot::Receiver<f64>) -> Self {
        TimeFuture(TimeFutureState::Pending(rx))
    }
}

impl Future for TimeFuture {
    type Output = Result<f64>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.0 {
            TimeFutureState::Ready(secs) => Poll::Ready(Ok(*secs)),
            TimeFutureState::Pending(rx) => Pin::new(rx).poll(cx).map(|result| {
                result.map_err(|_| {
                    Error::Queue("staging queue dropped before time barrier resolved".to_string())
                })
            }),
        }
    }
}

/// Resolver half of a hold placeholder
///
/// Consumed by value, so a hold can only be resolved once. Dropping it
/// unresolved permanently stalls the owning queue at the hold point.
#[derive(Debug)]
pub struct HoldResolver {
    tx: oneshot::Sender<Vec<SampleSource>>,
}

impl HoldResolver {
    /// Splice the given sources in at the hold's reserved position
    ///
    /// An empty list is a no-op splice: the queue continues immediately with
    /// no audio gap and no head-time advance.
    pub fn resolve(self, sources: Vec<SampleSource>) {
        // The receiver is only gone if the queue was torn down
        let _ = self.tx.send(sources);
    }
}

/// Internal pending-list entries
///
/// Extends SampleSource with the marker and barrier entries the drain loop
/// needs: `StreamWait`/`HoldWait` pin the front while a live stream or an
/// unresolved hold is in progress, and `Time` carries the coalesced waiters
/// of a time barrier.
#[derive(Debug)]
enum Entry {
    Buffer(Bytes),
    Silence { bytes: u64 },
    Stream(mpsc::Receiver<Bytes>),
    StreamWait,
    Hold(oneshot::Receiver<Vec<SampleSource>>),
    HoldWait,
    Time(Vec<oneshot::Sender<f64>>),
}

struct Inner {
    entries: VecDeque<Entry>,
    /// Bytes already delivered to the sink; only ever increases
    head_bytes: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            head_bytes: 0,
        }
    }

    fn head_secs(&self, sample_rate: u32) -> f64 {
        timing::bytes_to_secs(self.head_bytes, sample_rate)
    }
}

/// Aborts the drain task when the last queue handle drops
struct TaskGuard(Option<JoinHandle<()>>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Per-device staging queue
///
/// Cheaply cloneable handle; all clones share one pending list, head time,
/// and drain task. Created bound to one sample rate and one sink, living for
/// the lifetime of the device connection.
#[derive(Clone)]
pub struct StagingQueue {
    id: Uuid,
    config: StagerConfig,
    inner: Arc<Mutex<Inner>>,
    wake: Arc<Notify>,
    events: Option<Arc<EventBus>>,
    _drain: Arc<TaskGuard>,
}

impl StagingQueue {
    /// Create a queue draining into `sink`
    ///
    /// Must be called within a tokio runtime; the drain task is spawned
    /// immediately and parks until content arrives (or the underrun watchdog
    /// fires).
    pub fn new(config: StagerConfig, sink: impl AudioSink) -> Self {
        Self::with_events(config, sink, None)
    }

    /// Create a queue that also emits ChoraleEvents on `events`
    pub fn with_events(
        config: StagerConfig,
        sink: impl AudioSink,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        let id = Uuid::new_v4();
        let inner = Arc::new(Mutex::new(Inner::new()));
        let wake = Arc::new(Notify::new());

        let task = tokio::spawn(run_drain(
            id,
            config,
            Arc::clone(&inner),
            Arc::clone(&wake),
            sink,
            events.clone(),
        ));
        debug!("Staging queue {} created ({} Hz)", id, config.sample_rate);

        Self {
            id,
            config,
            inner,
            wake,
            events,
            _drain: Arc::new(TaskGuard(Some(task))),
        }
    }

    /// Queue id (one per device connection)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sample rate this queue's time math uses
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Configuration this queue was created with
    pub fn config(&self) -> StagerConfig {
        self.config
    }

    /// Seconds of audio already delivered to the sink
    pub fn head_time(&self) -> f64 {
        self.inner.lock().unwrap().head_secs(self.config.sample_rate)
    }

    /// Playback time at which the next appended item would begin
    ///
    /// Resolves immediately with the head time if the pending list is empty.
    /// Otherwise returns a future that resolves once everything currently
    /// queued has been consumed; bursts of calls coalesce onto a single
    /// barrier at the tail.
    pub fn current_time(&self) -> TimeFuture {
        let mut inner = self.inner.lock().unwrap();
        self.barrier_locked(&mut inner)
    }

    /// Enqueue a source, returning the playback time at which it will begin
    pub fn append(&self, source: SampleSource) -> TimeFuture {
        let start = {
            let mut inner = self.inner.lock().unwrap();
            let start = self.barrier_locked(&mut inner);
            if let Some(entry) = entry_for(source, self.config.sample_rate) {
                inner.entries.push_back(entry);
            }
            start
        };
        self.wake.notify_one();
        start
    }

    /// Enqueue float samples (clamped to [-1, 1] and quantized to PCM)
    pub fn append_floats(&self, values: Vec<f64>) -> TimeFuture {
        self.append(SampleSource::Floats(values))
    }

    /// Reserve a splice position without blocking the queue's siblings
    ///
    /// Returns the playback time at which the reserved position begins, and
    /// a resolver the caller invokes exactly once with the concrete sources
    /// to splice in. Content appended after the hold keeps its order: the
    /// resolved sources land at the reserved position, ahead of it.
    pub fn hold(&self) -> (TimeFuture, HoldResolver) {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut inner = self.inner.lock().unwrap();
            let start = self.barrier_locked(&mut inner);
            inner.entries.push_back(Entry::Hold(rx));
            start
        };
        self.wake.notify_one();
        (start, HoldResolver { tx })
    }

    /// Append a time barrier (or reuse the tail one) under the lock
    fn barrier_locked(&self, inner: &mut Inner) -> TimeFuture {
        if inner.entries.is_empty() {
            return TimeFuture::ready(inner.head_secs(self.config.sample_rate));
        }

        let (tx, rx) = oneshot::channel();
        if let Some(Entry::Time(waiters)) = inner.entries.back_mut() {
            waiters.push(tx);
        } else {
            inner.entries.push_back(Entry::Time(vec![tx]));
        }
        TimeFuture::pending(rx)
    }
}

impl std::fmt::Debug for StagingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingQueue")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}

/// Convert a public source into a pending-list entry
///
/// Zero-length buffers/arrays and silence that rounds to zero samples are
/// no-ops: nothing is enqueued, and surrounding time barriers are unaffected.
fn entry_for(source: SampleSource, sample_rate: u32) -> Option<Entry> {
    match source {
        SampleSource::Buffer(data) => {
            if data.is_empty() {
                None
            } else {
                Some(Entry::Buffer(data))
            }
        }
        SampleSource::Floats(values) => {
            if values.is_empty() {
                None
            } else {
                Some(Entry::Buffer(Bytes::from(dsp::quantize_floats(&values))))
            }
        }
        SampleSource::Silence(secs) => {
            let bytes = timing::secs_to_bytes(secs, sample_rate);
            if bytes == 0 {
                None
            } else {
                Some(Entry::Silence { bytes })
            }
        }
        SampleSource::Stream(rx) => Some(Entry::Stream(rx)),
        SampleSource::Hold(rx) => Some(Entry::Hold(rx)),
    }
}

// ========================================
// Drain task
// ========================================

/// What the drain loop should do next, decided under the inner lock
enum Step {
    /// Deliver these bytes to the sink (head time already advanced)
    Emit(Bytes),
    /// Front is a live stream; pump it until it ends
    Stream(mpsc::Receiver<Bytes>),
    /// Front is an unresolved hold; await its resolver
    Hold(oneshot::Receiver<Vec<SampleSource>>),
    /// Front is a wait marker owned by an earlier step; park until woken
    Blocked,
    /// Pending list is empty; arm the underrun watchdog
    Idle,
}

/// Decide the next step, resolving any leading time barriers in place
fn next_step(inner: &mut Inner, sample_rate: u32, zero: &Bytes) -> Step {
    loop {
        let Some(entry) = inner.entries.pop_front() else {
            return Step::Idle;
        };

        match entry {
            Entry::Time(waiters) => {
                let head = inner.head_secs(sample_rate);
                for tx in waiters {
                    let _ = tx.send(head);
                }
            }
            Entry::Buffer(data) => {
                inner.head_bytes += data.len() as u64;
                return Step::Emit(data);
            }
            Entry::Silence { bytes } => {
                let emit = bytes.min(zero.len() as u64);
                let left = bytes - emit;
                if left > 0 {
                    // Remaining duration stays at the front so resumption
                    // after backpressure continues exactly where it left off
                    inner.entries.push_front(Entry::Silence { bytes: left });
                }
                inner.head_bytes += emit;
                return Step::Emit(zero.slice(..emit as usize));
            }
            Entry::Stream(rx) => {
                inner.entries.push_front(Entry::StreamWait);
                return Step::Stream(rx);
            }
            Entry::Hold(rx) => {
                inner.entries.push_front(Entry::HoldWait);
                return Step::Hold(rx);
            }
            marker @ (Entry::StreamWait | Entry::HoldWait) => {
                inner.entries.push_front(marker);
                return Step::Blocked;
            }
        }
    }
}

/// Drain loop: pull entries front-to-back and feed the sink
///
/// Decisions are made under the inner lock; awaiting (sink capacity, stream
/// data, hold resolution, watchdog) happens without it, so appends and hold
/// resolutions from other tasks are never delayed by a parked queue.
async fn run_drain(
    id: Uuid,
    config: StagerConfig,
    inner: Arc<Mutex<Inner>>,
    wake: Arc<Notify>,
    mut sink: impl AudioSink,
    events: Option<Arc<EventBus>>,
) {
    // One zero chunk per queue, sliced for every silence emission
    let zero = Bytes::from(vec![0u8; config.chunk_bytes]);
    let watchdog = config.watchdog_interval();

    loop {
        let step = {
            let mut inner = inner.lock().unwrap();
            next_step(&mut inner, config.sample_rate, &zero)
        };

        let result = match step {
            Step::Emit(chunk) => deliver(&mut sink, chunk).await,
            Step::Stream(rx) => pump_stream(id, &inner, &mut sink, rx).await,
            Step::Hold(rx) => splice_hold(id, config.sample_rate, &inner, &events, rx).await,
            Step::Blocked => {
                wake.notified().await;
                Ok(())
            }
            Step::Idle => {
                idle_watchdog(id, config.sample_rate, &inner, &wake, &mut sink, &zero, watchdog, &events)
                    .await
            }
        };

        if let Err(e) = result {
            error!("Staging queue {} sink failed, stopping drain: {}", id, e);
            return;
        }
    }
}

/// Push one chunk to the sink, waiting out backpressure
async fn deliver(sink: &mut impl AudioSink, chunk: Bytes) -> Result<()> {
    if !sink.accept(chunk).await? {
        sink.ready().await?;
    }
    Ok(())
}

/// Pump a live stream source until its sender is dropped
async fn pump_stream(
    id: Uuid,
    inner: &Arc<Mutex<Inner>>,
    sink: &mut impl AudioSink,
    mut rx: mpsc::Receiver<Bytes>,
) -> Result<()> {
    while let Some(chunk) = rx.recv().await {
        if chunk.is_empty() {
            continue;
        }
        {
            let mut inner = inner.lock().unwrap();
            inner.head_bytes += chunk.len() as u64;
        }
        trace!("Staging queue {} stream chunk: {} bytes", id, chunk.len());
        deliver(sink, chunk).await?;
    }

    let mut inner = inner.lock().unwrap();
    if matches!(inner.entries.front(), Some(Entry::StreamWait)) {
        inner.entries.pop_front();
    }
    debug!("Staging queue {} stream source ended", id);
    Ok(())
}

/// Await a hold's resolver and splice the resolved sources in at the front
async fn splice_hold(
    id: Uuid,
    sample_rate: u32,
    inner: &Arc<Mutex<Inner>>,
    events: &Option<Arc<EventBus>>,
    rx: oneshot::Receiver<Vec<SampleSource>>,
) -> Result<()> {
    match rx.await {
        Ok(sources) => {
            let spliced = sources.len();
            {
                let mut inner = inner.lock().unwrap();
                if matches!(inner.entries.front(), Some(Entry::HoldWait)) {
                    inner.entries.pop_front();
                }
                for source in sources.into_iter().rev() {
                    if let Some(entry) = entry_for(source, sample_rate) {
                        inner.entries.push_front(entry);
                    }
                }
            }
            debug!("Staging queue {} hold resolved with {} sources", id, spliced);
            if let Some(bus) = events {
                bus.emit_lossy(ChoraleEvent::HoldResolved {
                    queue_id: id,
                    spliced,
                    timestamp: chrono::Utc::now(),
                });
            }
            Ok(())
        }
        Err(_) => {
            // The HoldWait marker stays at the front: the queue stalls here
            // until teardown, which is the documented caller responsibility
            warn!("Staging queue {} hold resolver dropped, queue stalled", id);
            Ok(())
        }
    }
}

/// Park on an empty queue, delivering one silence chunk per watchdog interval
///
/// If nothing has been appended by the time one chunk-duration elapses, a
/// single zero chunk is delivered and head time advances by exactly that
/// duration, so the sink never starves into end-of-stream. An append arriving
/// first wins the race and cancels the silence.
#[allow(clippy::too_many_arguments)]
async fn idle_watchdog(
    id: Uuid,
    sample_rate: u32,
    inner: &Arc<Mutex<Inner>>,
    wake: &Arc<Notify>,
    sink: &mut impl AudioSink,
    zero: &Bytes,
    watchdog: std::time::Duration,
    events: &Option<Arc<EventBus>>,
) -> Result<()> {
    tokio::select! {
        _ = wake.notified() => Ok(()),
        _ = tokio::time::sleep(watchdog) => {
            let head_secs = {
                let mut inner = inner.lock().unwrap();
                if !inner.entries.is_empty() {
                    // An append raced the timeout; no silence needed
                    return Ok(());
                }
                inner.head_bytes += zero.len() as u64;
                inner.head_secs(sample_rate)
            };

            trace!("Staging queue {} underrun, delivering silence chunk", id);
            if let Some(bus) = events {
                bus.emit_lossy(ChoraleEvent::WatchdogSilence {
                    queue_id: id,
                    head_secs,
                    timestamp: chrono::Utc::now(),
                });
            }
            deliver(sink, zero.clone()).await
        }
    }
}
