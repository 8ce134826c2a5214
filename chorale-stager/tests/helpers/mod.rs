//! Shared fixtures for staging queue and synchronization tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chorale_stager::{AudioSink, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Install a subscriber so `RUST_LOG` controls output when debugging tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// State shared between a [`CapacitySink`] and its probe
struct SinkState {
    collected: Mutex<Vec<u8>>,
    remaining: Mutex<usize>,
    capacity_granted: Notify,
    data_arrived: Notify,
}

/// Test sink that accepts a fixed number of bytes before backpressuring
///
/// Every chunk is consumed in full; `accept` returns `false` once the
/// granted capacity is exhausted, and `ready` resolves when the probe
/// grants more.
pub struct CapacitySink {
    state: Arc<SinkState>,
}

/// Inspection/control handle for a [`CapacitySink`]
#[derive(Clone)]
pub struct SinkProbe {
    state: Arc<SinkState>,
}

/// Create a sink that accepts `capacity` bytes before backpressuring
pub fn capacity_sink(capacity: usize) -> (CapacitySink, SinkProbe) {
    let state = Arc::new(SinkState {
        collected: Mutex::new(Vec::new()),
        remaining: Mutex::new(capacity),
        capacity_granted: Notify::new(),
        data_arrived: Notify::new(),
    });
    (
        CapacitySink {
            state: Arc::clone(&state),
        },
        SinkProbe { state },
    )
}

/// Create a sink that never backpressures
pub fn unbounded_sink() -> (CapacitySink, SinkProbe) {
    capacity_sink(usize::MAX)
}

#[async_trait]
impl AudioSink for CapacitySink {
    async fn accept(&mut self, chunk: Bytes) -> Result<bool> {
        self.state
            .collected
            .lock()
            .unwrap()
            .extend_from_slice(&chunk);

        let mut remaining = self.state.remaining.lock().unwrap();
        *remaining = remaining.saturating_sub(chunk.len());
        let more = *remaining > 0;
        drop(remaining);

        self.state.data_arrived.notify_waiters();
        Ok(more)
    }

    async fn ready(&mut self) -> Result<()> {
        loop {
            let granted = self.state.capacity_granted.notified();
            if *self.state.remaining.lock().unwrap() > 0 {
                return Ok(());
            }
            granted.await;
        }
    }
}

impl SinkProbe {
    /// Allow the sink to accept `bytes` more bytes
    pub fn grant(&self, bytes: usize) {
        let mut remaining = self.state.remaining.lock().unwrap();
        *remaining = remaining.saturating_add(bytes);
        drop(remaining);
        self.state.capacity_granted.notify_waiters();
    }

    /// Bytes delivered so far
    pub fn len(&self) -> usize {
        self.state.collected.lock().unwrap().len()
    }

    /// Copy of everything delivered so far
    pub fn collected(&self) -> Vec<u8> {
        self.state.collected.lock().unwrap().clone()
    }

    /// Wait until at least `target` bytes have been delivered
    pub async fn wait_for_len(&self, target: usize) {
        loop {
            let arrived = self.state.data_arrived.notified();
            if self.len() >= target {
                return;
            }
            arrived.await;
        }
    }
}
