//! Clock-offset estimation
//!
//! Learns, per remote device, the additive correction to apply to target
//! offsets so content scheduled at the same virtual time is heard at the
//! same physical instant everywhere.
//!
//! The acoustic protocol is a single round trip per session id: the server
//! tells the device what frequency to listen for, stages an audible chirp on
//! that device's queue, and subtracts the chirp's scheduled start time from
//! the observed arrival timestamp the device reports back. The coarse
//! `autosync` variant needs no tone and only captures relative scheduling
//! drift across devices.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chorale_common::events::ChoraleEvent;
use chorale_common::protocol::{DetectRequest, TimestampReport};
use chorale_common::{dsp, EventBus};
use futures::future::try_join_all;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::staging::queue::StagingQueue;
use crate::{Error, Result};

/// Default detection frequency: high enough to sit above program material
const DETECT_FREQUENCY: f64 = 20_000.0;

/// Default chirp duration in seconds
const CHIRP_SECONDS: f64 = 1.0;

/// Default chirp gain, kept low so calibration is unobtrusive
const CHIRP_GAIN: f64 = 0.1;

/// Outbound half of the remote timestamp channel
///
/// The transport (socket, message bus) is the application's concern; the
/// estimator only needs to send one small message per session. Inbound
/// reports are fed to [`ClockOffsetEstimator::handle_report`] by the
/// transport glue.
#[async_trait::async_trait]
pub trait TimestampChannel: Send + Sync {
    /// Ask the remote device to prepare to detect a tone
    async fn send_detect(&self, request: DetectRequest) -> Result<()>;
}

/// One in-flight calibration round trip
struct Session {
    /// Chirp start time, set once the queue schedules it
    scheduled_start: Arc<OnceLock<f64>>,
    /// Resolves the estimate() caller with the measured offset
    result: oneshot::Sender<f64>,
}

/// Per-device clock-offset estimation
///
/// Concurrent sessions for different devices are independent; each session
/// id is used exactly once. Stray or early reports are logged and dropped,
/// never fatal.
pub struct ClockOffsetEstimator<C: TimestampChannel> {
    channel: C,
    sessions: Mutex<HashMap<Uuid, Session>>,
    chirp_frequency: f64,
    chirp_seconds: f64,
    chirp_gain: f64,
    events: Option<Arc<EventBus>>,
}

impl<C: TimestampChannel> ClockOffsetEstimator<C> {
    /// Create an estimator sending detect requests over `channel`
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            sessions: Mutex::new(HashMap::new()),
            chirp_frequency: DETECT_FREQUENCY,
            chirp_seconds: CHIRP_SECONDS,
            chirp_gain: CHIRP_GAIN,
            events: None,
        }
    }

    /// Override the calibration chirp's frequency, duration, and gain
    pub fn with_chirp(mut self, frequency: f64, seconds: f64, gain: f64) -> Self {
        self.chirp_frequency = frequency;
        self.chirp_seconds = seconds;
        self.chirp_gain = gain;
        self
    }

    /// Emit ChoraleEvents on `events`
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run one calibration round trip against `queue`'s device
    ///
    /// Stages the detection chirp, records its scheduled start time, and
    /// resolves with `observed_timestamp - scheduled_start` once the device
    /// reports back.
    pub async fn estimate(&self, queue: &StagingQueue) -> Result<f64> {
        let id = Uuid::new_v4();
        let scheduled_start = Arc::new(OnceLock::new());
        let (tx, rx) = oneshot::channel();

        // Register before the detect request goes out: a transport that
        // answers within the send must already find the session
        {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.insert(
                id,
                Session {
                    scheduled_start: Arc::clone(&scheduled_start),
                    result: tx,
                },
            );
        }
        debug!("Clock offset session {} opened", id);

        if let Err(e) = self
            .channel
            .send_detect(DetectRequest {
                id,
                frequency: self.chirp_frequency,
            })
            .await
        {
            self.sessions.lock().unwrap().remove(&id);
            return Err(e);
        }

        let mut chirp = dsp::sine_wave(queue.sample_rate(), self.chirp_frequency, self.chirp_seconds);
        dsp::scale(&mut chirp, self.chirp_gain);
        let start = queue.append_floats(chirp);

        // Record the scheduled start as soon as the queue reaches the chirp
        tokio::spawn(async move {
            match start.await {
                Ok(secs) => {
                    let _ = scheduled_start.set(secs);
                }
                Err(e) => warn!("Clock offset session {} lost its queue: {}", id, e),
            }
        });

        rx.await
            .map_err(|_| Error::Protocol(format!("session {} cancelled before completion", id)))
    }

    /// Feed an inbound timestamp report from the transport
    ///
    /// A report for an unknown or already-resolved session id, or one that
    /// arrives before the chirp's start time is known, is logged and dropped.
    pub fn handle_report(&self, report: TimestampReport) {
        let mut sessions = self.sessions.lock().unwrap();

        let Some(session) = sessions.remove(&report.id) else {
            warn!(
                "Timestamp report for unknown session {}, dropping",
                report.id
            );
            return;
        };

        let Some(&start) = session.scheduled_start.get() else {
            warn!(
                "Timestamp report for session {} before chirp was scheduled, dropping",
                report.id
            );
            sessions.insert(report.id, session);
            return;
        };

        let offset = report.timestamp - start;
        debug!(
            "Clock offset session {} measured {:.4}s (observed {:.4}s, scheduled {:.4}s)",
            report.id, offset, report.timestamp, start
        );

        // The caller gave up only if estimate() was cancelled
        let _ = session.result.send(offset);

        if let Some(bus) = &self.events {
            bus.emit_lossy(ChoraleEvent::ClockOffsetMeasured {
                session_id: report.id,
                offset_secs: offset,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Number of sessions still waiting on a report
    pub fn pending_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

/// Coarse no-tone variant: relative scheduling drift across devices
///
/// Reads every queue's scheduled time twice, `wait` apart; each device's
/// offset is its second read. Suitable when only relative drift matters and
/// acoustic calibration is unnecessary.
pub async fn autosync(queues: &[StagingQueue], wait: Duration) -> Result<Vec<f64>> {
    let first = try_join_all(queues.iter().map(StagingQueue::current_time)).await?;

    tokio::time::sleep(wait).await;

    let second = try_join_all(queues.iter().map(StagingQueue::current_time)).await?;

    for (queue, (a, b)) in queues.iter().zip(first.iter().zip(&second)) {
        debug!(
            "Queue {} advanced {:.3}s -> {:.3}s during autosync",
            queue.id(),
            a,
            b
        );
    }
    Ok(second)
}
