//! End-to-end: ingest a chunk, estimate throughput from a qlog trace on
//! disk, serve the best-fit variant and let housekeeping evict it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::TimeDelta;
use moqabr_core::{QualityLadder, QualityLevel};
use moqabr_relay::telemetry::{clear_qlog_dir, qlog_path};
use moqabr_relay::{Housekeeper, ObjectHeader, ObjectStore, Relay, ThroughputEstimator, ThroughputQuery};
use moqabr_wire::{ChunkEnvelope, ChunkType, MediaType};

const REFERENCE_MS: i64 = 1_718_000_000_000;

fn write_trace(dir: &std::path::Path, lines: &[String]) -> std::path::PathBuf {
    clear_qlog_dir(dir).unwrap();
    let path = qlog_path(dir, "server", "a1b2c3");
    let header = format!(
        r#"{{"qlog_version":"draft-02","qlog_format":"JSON-SEQ","trace":{{"common_fields":{{"reference_time":{REFERENCE_MS}}}}}}}"#
    );
    let body = std::iter::once(&header)
        .chain(lines)
        .map(|line| format!("\x1e{line}\n"))
        .collect::<String>();
    std::fs::write(&path, body).unwrap();
    path
}

fn metrics(time: u32, rtt: u32, bytes: u64) -> String {
    format!(
        r#"{{"time":{time},"name":"recovery:metrics_updated","data":{{"smoothed_rtt":{rtt},"bytes_in_flight":{bytes}}}}}"#
    )
}

fn chunk(seq: u64) -> ChunkEnvelope {
    ChunkEnvelope::new(MediaType::Video, ChunkType::Delta, seq, seq * 3_000)
        .with_duration(3_000)
        .with_first_frame_clkms(REFERENCE_MS as u64)
        .with_metadata(Bytes::from_static(b"avc1.42e01e"))
        .with_data(Bytes::from(vec![0xab; 4_096]))
}

fn window(estimator: &ThroughputEstimator, from_ms: i64, to_ms: i64) -> ThroughputQuery {
    let reference = estimator.trace().reference_time();
    ThroughputQuery::Connection {
        from: reference + TimeDelta::milliseconds(from_ms),
        to: reference + TimeDelta::milliseconds(to_ms),
    }
}

#[tokio::test]
async fn test_consumer_gets_variant_matching_connection_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_trace(
        dir.path(),
        &[
            // ~600 kbps between 0 and 100 ms, ~40 kbps after
            metrics(10, 20, 1_500),
            metrics(50, 20, 1_500),
            metrics(150, 200, 1_000),
        ],
    );

    let store = Arc::new(ObjectStore::new(QualityLadder::default()));
    let relay = Relay::new(Arc::clone(&store), 60);
    relay.ingest("live/cam1", &ObjectHeader::default(), &chunk(1)).unwrap();

    let estimator = ThroughputEstimator::load_qlog(&path).await.unwrap();

    let fast = relay.serve("live/cam1", Some(&estimator), &window(&estimator, 0, 100)).unwrap();
    assert_eq!(fast.estimated_kbps, Some(600));
    assert_eq!(fast.bitrate_kbps, 500);
    assert_eq!(fast.chunk().unwrap(), chunk(1));

    // Below the lowest rung still gets served
    let slow = relay.serve("live/cam1", Some(&estimator), &window(&estimator, 100, 200)).unwrap();
    assert_eq!(slow.estimated_kbps, Some(40));
    assert_eq!(slow.bitrate_kbps, 100);

    // Empty window: no estimate, conservative variant
    let unknown = relay.serve("live/cam1", Some(&estimator), &window(&estimator, 500, 600)).unwrap();
    assert_eq!(unknown.estimated_kbps, None);
    assert_eq!(unknown.bitrate_kbps, 100);
}

#[tokio::test]
async fn test_custom_ladder() {
    let ladder = QualityLadder::new(vec![
        QualityLevel::new(2_500, "1280x720", 2_500, 3_750),
        QualityLevel::new(300, "480x270", 300, 450),
    ])
    .unwrap();
    let store = Arc::new(ObjectStore::new(ladder));
    let relay = Relay::new(Arc::clone(&store), 60);
    relay.ingest("live/cam2", &ObjectHeader::default(), &chunk(2)).unwrap();

    assert_eq!(store.bitrates("live/cam2"), Some(vec![300, 2_500]));
    assert_eq!(store.get("live/cam2", 2_499).map(|(b, _)| b), Some(300));
    assert_eq!(store.get("live/cam2", 9_000).map(|(b, _)| b), Some(2_500));
}

#[tokio::test(start_paused = true)]
async fn test_housekeeping_evicts_served_stream() {
    let store = Arc::new(ObjectStore::new(QualityLadder::default()));
    let relay = Relay::new(Arc::clone(&store), 1);
    relay.ingest("live/cam3", &ObjectHeader::default(), &chunk(3)).unwrap();
    relay.ingest("live/cam4", &ObjectHeader::default(), &chunk(4)).unwrap();

    let housekeeper = Housekeeper::start(Arc::clone(&store), Duration::from_millis(200))
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(store.len(), 2);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(store.is_empty());

    housekeeper.stop().await;
}
