//! Integration tests for the staging queue
//!
//! All tests run on a paused tokio clock so watchdog timing is deterministic.

mod helpers;

use std::time::Duration;

use bytes::Bytes;
use chorale_common::StagerConfig;
use chorale_stager::{SampleSource, StagingQueue};
use helpers::{capacity_sink, unbounded_sink};
use tokio::sync::mpsc;
use tokio::time::timeout;

const CHUNK_SECS: f64 = 4096.0 / 48000.0;

#[tokio::test(start_paused = true)]
async fn test_head_time_accumulates_over_buffers() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    assert_eq!(queue.head_time(), 0.0);

    // 480 samples then 960 samples at 48 kHz
    let first = queue.append(SampleSource::buffer(vec![1u8; 960]));
    let second = queue.append(SampleSource::buffer(vec![2u8; 1920]));
    let end = queue.current_time();

    assert_eq!(first.await.unwrap(), 0.0);
    assert_eq!(second.await.unwrap(), 0.01);
    assert_eq!(end.await.unwrap(), 0.03);
    assert_eq!(queue.head_time(), 0.03);
    assert_eq!(probe.len(), 2880);
}

#[tokio::test(start_paused = true)]
async fn test_current_time_empty_resolves_immediately() {
    let (sink, _probe) = capacity_sink(0);
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    assert_eq!(queue.current_time().await.unwrap(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_current_time_waits_for_consumption() {
    let (sink, probe) = capacity_sink(0);
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    queue.append(SampleSource::buffer(vec![1u8; 960]));
    let mut barrier = queue.current_time();

    // The sink has no capacity: the buffer is handed over but the queue then
    // parks on backpressure, so the barrier must not resolve yet
    assert!(timeout(Duration::from_millis(10), &mut barrier)
        .await
        .is_err());
    assert_eq!(probe.len(), 960);

    probe.grant(1);
    assert_eq!(barrier.await.unwrap(), 0.01);
}

#[tokio::test(start_paused = true)]
async fn test_zero_length_appends_are_no_ops() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    assert_eq!(
        queue.append(SampleSource::buffer(Vec::new())).await.unwrap(),
        0.0
    );
    assert_eq!(
        queue.append(SampleSource::Floats(Vec::new())).await.unwrap(),
        0.0
    );
    assert_eq!(
        queue.append(SampleSource::Silence(-5.0)).await.unwrap(),
        0.0
    );

    // Nothing was enqueued, so the queue is still empty and at time zero
    assert_eq!(queue.current_time().await.unwrap(), 0.0);
    assert_eq!(queue.head_time(), 0.0);
    assert_eq!(probe.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_silence_then_buffer_timeline() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    let silence_start = queue.append(SampleSource::Silence(0.1));
    let buffer_start = queue.append(SampleSource::buffer(vec![7u8; 960]));
    let end = queue.current_time();

    assert_eq!(silence_start.await.unwrap(), 0.0);
    assert_eq!(buffer_start.await.unwrap(), 0.1);
    assert_eq!(end.await.unwrap(), 0.11);
    assert_eq!(queue.head_time(), 0.11);

    let collected = probe.collected();
    assert_eq!(collected.len(), 9600 + 960);
    assert!(collected[..9600].iter().all(|b| *b == 0));
    assert!(collected[9600..].iter().all(|b| *b == 7));
}

#[tokio::test(start_paused = true)]
async fn test_silence_resumes_exactly_after_backpressure() {
    helpers::init_tracing();
    let (sink, probe) = capacity_sink(8192);
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    // 2.5 chunks of silence: 20480 bytes
    let secs = 20480.0 / 2.0 / 48000.0;
    queue.append(SampleSource::Silence(secs));
    let mut end = queue.current_time();

    assert!(timeout(Duration::from_millis(10), &mut end).await.is_err());
    assert_eq!(probe.len(), 8192);

    probe.grant(8192);
    assert!(timeout(Duration::from_millis(10), &mut end).await.is_err());
    assert_eq!(probe.len(), 16384);

    probe.grant(1 << 20);
    assert_eq!(end.await.unwrap(), secs);
    assert_eq!(probe.len(), 20480);
    assert_eq!(queue.head_time(), secs);
    assert!(probe.collected().iter().all(|b| *b == 0));
}

#[tokio::test(start_paused = true)]
async fn test_stream_source_blocks_later_content() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    let (tx, rx) = mpsc::channel(4);
    let stream_start = queue.append(SampleSource::Stream(rx));
    let after_stream = queue.append(SampleSource::buffer(vec![9u8; 960]));

    tx.send(Bytes::from(vec![1u8; 960])).await.unwrap();
    tx.send(Bytes::from(vec![2u8; 960])).await.unwrap();
    probe.wait_for_len(1920).await;

    // The buffer appended behind the stream stays queued while the stream
    // is still open
    assert_eq!(probe.len(), 1920);
    assert_eq!(stream_start.await.unwrap(), 0.0);

    drop(tx);
    assert_eq!(after_stream.await.unwrap(), 0.02);
    assert_eq!(queue.current_time().await.unwrap(), 0.03);

    let collected = probe.collected();
    assert!(collected[..960].iter().all(|b| *b == 1));
    assert!(collected[960..1920].iter().all(|b| *b == 2));
    assert!(collected[1920..].iter().all(|b| *b == 9));
}

#[tokio::test(start_paused = true)]
async fn test_hold_splices_at_reserved_position() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    queue.append(SampleSource::buffer(vec![1u8; 960]));
    let (hold_start, resolver) = queue.hold();
    let after_hold = queue.append(SampleSource::buffer(vec![3u8; 960]));

    // Content ahead of the hold flows; content behind it waits
    probe.wait_for_len(960).await;
    assert_eq!(probe.len(), 960);
    assert_eq!(hold_start.await.unwrap(), 0.01);

    resolver.resolve(vec![SampleSource::buffer(vec![2u8; 960])]);

    assert_eq!(after_hold.await.unwrap(), 0.02);
    assert_eq!(queue.current_time().await.unwrap(), 0.03);

    let collected = probe.collected();
    assert!(collected[..960].iter().all(|b| *b == 1));
    assert!(collected[960..1920].iter().all(|b| *b == 2));
    assert!(collected[1920..].iter().all(|b| *b == 3));
}

#[tokio::test(start_paused = true)]
async fn test_hold_empty_splice_continues_without_gap() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    queue.append(SampleSource::buffer(vec![1u8; 960]));
    let (_hold_start, resolver) = queue.hold();
    let after_hold = queue.append(SampleSource::buffer(vec![3u8; 960]));

    resolver.resolve(Vec::new());

    assert_eq!(after_hold.await.unwrap(), 0.01);
    assert_eq!(queue.current_time().await.unwrap(), 0.02);
    assert_eq!(probe.len(), 1920);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_hold_resolver_stalls_queue() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    let (_hold_start, resolver) = queue.hold();
    drop(resolver);
    queue.append(SampleSource::buffer(vec![1u8; 960]));

    // The stalled hold pins the queue front: no content, no watchdog silence
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(probe.len(), 0);
    assert_eq!(queue.head_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_delivers_silence_on_underrun() {
    helpers::init_tracing();
    let (sink, probe) = capacity_sink(8192);
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    // Nothing appended: one chunk-duration later the watchdog feeds a zero
    // chunk so the sink never starves
    probe.wait_for_len(8192).await;
    assert_eq!(queue.head_time(), CHUNK_SECS);
    assert!(probe.collected().iter().all(|b| *b == 0));

    // Backpressure parks the queue, so no further chunks pile up
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(probe.len(), 8192);
}

#[tokio::test(start_paused = true)]
async fn test_append_cancels_pending_watchdog() {
    let (sink, probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    queue.append(SampleSource::buffer(vec![5u8; 960]));
    probe.wait_for_len(960).await;

    // The appended buffer arrives with no watchdog silence ahead of it
    let collected = probe.collected();
    assert_eq!(collected.len(), 960);
    assert!(collected.iter().all(|b| *b == 5));
    assert_eq!(queue.head_time(), 0.01);
}

#[tokio::test(start_paused = true)]
async fn test_time_barriers_coalesce_at_tail() {
    let (sink, _probe) = unbounded_sink();
    let queue = StagingQueue::new(StagerConfig::default(), sink);

    queue.append(SampleSource::buffer(vec![1u8; 960]));
    let first = queue.current_time();
    let second = queue.current_time();

    assert_eq!(first.await.unwrap(), 0.01);
    assert_eq!(second.await.unwrap(), 0.01);
}
