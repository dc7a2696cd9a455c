//! End-to-end tests over TCP
//!
//! These tests start a real listener on 127.0.0.1 and read it back through
//! `StreamClient`, checking banner contents, ordering, pacing, looping and
//! session isolation.

mod common;

use common::*;
use sentinel_event_stream::service::{ReplayServer, ServiceError, StreamClient};
use sentinel_event_stream::MergedTimeline;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_single_pass_example_scenario() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 10.0, false)).await;

    let mut client = StreamClient::connect(server.addr).await.unwrap();
    let banner = client.banner().clone();
    assert_eq!(banner.service, "test-stream");
    assert_eq!(banner.datasets, vec!["POS_Transactions".to_string(), "RFID_data".to_string()]);
    assert_eq!(banner.events, 3);
    assert!(!banner.loop_enabled);
    assert_eq!(banner.speed_factor, 10.0);
    assert_eq!(banner.cycle_seconds, 5.0);
    assert!(!banner.schema.is_empty());

    let mut frames = Vec::new();
    let mut arrivals = Vec::new();
    while let Some(frame) = timeout(READ_TIMEOUT, client.next_frame()).await.unwrap().unwrap() {
        arrivals.push(Instant::now());
        frames.push(frame);
    }

    assert_eq!(frames.iter().map(|f| f.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(
        frames.iter().map(|f| f.dataset.as_str()).collect::<Vec<_>>(),
        vec!["POS_Transactions", "RFID_data", "POS_Transactions"]
    );
    for frame in &frames {
        assert_eq!(frame.timestamp, frame.original_timestamp);
    }

    let first_gap = arrivals[1].duration_since(arrivals[0]).as_secs_f64();
    let second_gap = arrivals[2].duration_since(arrivals[1]).as_secs_f64();
    assert!((first_gap - 0.2).abs() < 0.08, "first gap {first_gap}");
    assert!((second_gap - 0.3).abs() < 0.08, "second gap {second_gap}");

    server.shutdown.send(true).unwrap();
    timeout(READ_TIMEOUT, server.handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_payload_is_forwarded_verbatim() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 100.0, false)).await;

    let mut client = StreamClient::connect(server.addr).await.unwrap();
    let frames = timeout(READ_TIMEOUT, client.collect(0)).await.unwrap().unwrap();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].event, pos("2025-08-13T16:00:00", "TXN_1"));
    assert_eq!(frames[1].event, rfid("2025-08-13T16:00:02", "E200"));
    assert_eq!(frames[2].event, pos("2025-08-13T16:00:05", "TXN_2"));
}

#[tokio::test]
async fn test_loop_resets_sequence_and_rebases_timestamps() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 100.0, true)).await;

    let mut client = StreamClient::connect(server.addr).await.unwrap();
    assert!(client.banner().loop_enabled);

    let frames = timeout(READ_TIMEOUT, client.collect(9)).await.unwrap().unwrap();
    let sequences: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);

    assert_eq!(frames[3].original_timestamp, "2025-08-13T16:00:00");
    assert_eq!(frames[3].timestamp, "2025-08-13T16:00:05");
    assert_eq!(frames[5].original_timestamp, "2025-08-13T16:00:05");
    assert_eq!(frames[5].timestamp, "2025-08-13T16:00:10");
    assert_eq!(frames[7].original_timestamp, "2025-08-13T16:00:02");
    assert_eq!(frames[7].timestamp, "2025-08-13T16:00:12");
    assert_eq!(frames[3].event, frames[0].event);

    server.shutdown.send(true).unwrap();
    timeout(READ_TIMEOUT, server.handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_dataset_filter_limits_stream_and_banner() {
    let root = example_data_root();
    let mut config = test_config(root.path(), 100.0, false);
    config.datasets = vec!["rfid_readings".to_string()];
    let server = start_server(&config).await;

    let mut client = StreamClient::connect(server.addr).await.unwrap();
    assert_eq!(client.banner().datasets, vec!["RFID_data".to_string()]);
    assert_eq!(client.banner().events, 1);
    assert_eq!(client.banner().cycle_seconds, 1.0);

    let frames = timeout(READ_TIMEOUT, client.collect(0)).await.unwrap().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames.iter().all(|f| f.dataset == "RFID_data"));
}

#[tokio::test]
async fn test_concurrent_clients_replay_independently() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 100.0, true)).await;

    let mut early = StreamClient::connect(server.addr).await.unwrap();
    let early_frames = timeout(READ_TIMEOUT, early.collect(5)).await.unwrap().unwrap();
    assert_eq!(early_frames.last().map(|f| f.sequence), Some(2));

    let mut late = StreamClient::connect(server.addr).await.unwrap();
    let late_frames = timeout(READ_TIMEOUT, late.collect(3)).await.unwrap().unwrap();
    assert_eq!(late_frames.iter().map(|f| f.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(late_frames[0].timestamp, "2025-08-13T16:00:00");

    let more_early = timeout(READ_TIMEOUT, early.collect(1)).await.unwrap().unwrap();
    assert_eq!(more_early[0].sequence, 3);

    server.shutdown.send(true).unwrap();
    timeout(READ_TIMEOUT, server.handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_does_not_affect_other_sessions() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 100.0, true)).await;

    let mut steady = StreamClient::connect(server.addr).await.unwrap();
    {
        let mut leaving = StreamClient::connect(server.addr).await.unwrap();
        timeout(READ_TIMEOUT, leaving.collect(2)).await.unwrap().unwrap();
    }

    let frames = timeout(READ_TIMEOUT, steady.collect(12)).await.unwrap().unwrap();
    assert_eq!(frames.len(), 12);
    let expected: Vec<u64> = (0..12).map(|i| i % 3 + 1).collect();
    assert_eq!(frames.iter().map(|f| f.sequence).collect::<Vec<_>>(), expected);

    // New connections are still accepted
    let mut fresh = StreamClient::connect(server.addr).await.unwrap();
    assert_eq!(fresh.banner().events, 3);
    assert_eq!(timeout(READ_TIMEOUT, fresh.collect(1)).await.unwrap().unwrap()[0].sequence, 1);

    server.shutdown.send(true).unwrap();
    timeout(READ_TIMEOUT, server.handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_active_sessions() {
    let root = example_data_root();
    let server = start_server(&test_config(root.path(), 1.0, true)).await;

    let mut client = StreamClient::connect(server.addr).await.unwrap();
    let first = timeout(READ_TIMEOUT, client.next_frame()).await.unwrap().unwrap();
    assert_eq!(first.map(|f| f.sequence), Some(1));

    server.shutdown.send(true).unwrap();
    timeout(READ_TIMEOUT, server.handle).await.unwrap().unwrap().unwrap();

    // The next record is two seconds away, so the stream closes before it
    let rest = timeout(READ_TIMEOUT, client.collect(0)).await.unwrap().unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let root = example_data_root();
    let config = test_config(root.path(), 1.0, false);
    let server = start_server(&config).await;

    let mut taken = config.clone();
    taken.port = server.addr.port();
    let timeline: Arc<MergedTimeline> =
        Arc::new(sentinel_event_stream::prepare_timeline(&taken).unwrap());
    let result = ReplayServer::bind(&taken, timeline).await;
    match result {
        Err(error @ ServiceError::Bind { .. }) => assert_eq!(error.category(), "Network"),
        other => panic!("expected bind error, got {:?}", other.map(|_| ())),
    }

    server.shutdown.send(true).unwrap();
}
