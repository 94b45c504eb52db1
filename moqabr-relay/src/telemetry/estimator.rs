use std::path::PathBuf;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, trace};

use super::qlog::{PacketRecord, QlogFile, QlogTrace, TelemetrySource};
use crate::error::TelemetryError;

/// Which throughput figure to derive.
///
/// The two modes answer different questions and are never mixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThroughputQuery {
    /// Smoothed connection rate: mean of bytes_in_flight × 8 ÷ RTT over
    /// samples in `[from, to)`.
    Connection {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Observed rate of one stream: `bytes` × 8 over the span between its
    /// earliest and latest packet records.
    Stream { stream_id: u64, bytes: u64 },
}

/// Throughput estimation over one connection's trace
#[derive(Debug, Clone)]
pub struct ThroughputEstimator {
    trace: QlogTrace,
}

impl ThroughputEstimator {
    #[must_use]
    pub const fn new(trace: QlogTrace) -> Self {
        Self { trace }
    }

    pub fn from_source(source: &dyn TelemetrySource) -> Result<Self, TelemetryError> {
        QlogTrace::load(source).map(Self::new)
    }

    /// Load a qlog file on the blocking pool.
    pub async fn load_qlog(path: impl Into<PathBuf>) -> Result<Self, TelemetryError> {
        let file = QlogFile::new(path);
        tokio::task::spawn_blocking(move || Self::from_source(&file))
            .await
            .map_err(|e| TelemetryError::Io(std::io::Error::other(e)))?
    }

    #[must_use]
    pub const fn trace(&self) -> &QlogTrace {
        &self.trace
    }

    /// Estimated throughput in kbit/s for `query`.
    pub fn estimate(&self, query: &ThroughputQuery) -> Result<u64, TelemetryError> {
        match query {
            ThroughputQuery::Connection { from, to } => self.connection_throughput_kbps(*from, *to),
            ThroughputQuery::Stream { stream_id, bytes } => {
                self.stream_throughput_kbps(*stream_id, *bytes)
            }
        }
    }

    /// Windowed mean over `[from, to)`.
    ///
    /// An empty window is `EmptyWindow`, never a zero estimate.
    pub fn connection_throughput_kbps(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, TelemetryError> {
        if to <= from {
            return Err(TelemetryError::InvalidWindow(format!("{from} .. {to}")));
        }

        let start = self.trace.offset_ms(from);
        let end = self.trace.offset_ms(to);

        let rates: Vec<f64> = self
            .trace
            .samples()
            .iter()
            .filter(|s| s.offset_ms >= start && s.offset_ms < end)
            .filter_map(|s| s.throughput_kbps())
            .collect();

        if rates.is_empty() {
            return Err(TelemetryError::EmptyWindow);
        }

        let mean = rates.iter().sum::<f64>() / rates.len() as f64;
        debug!(
            window_start_ms = start,
            window_end_ms = end,
            samples = rates.len(),
            kbps = mean,
            "Connection throughput"
        );
        Ok(mean as u64)
    }

    /// Span-based rate of `stream_id` having moved `bytes`.
    ///
    /// Needs two or more complete packet records for the stream with
    /// distinct times. Records may appear in any order.
    pub fn stream_throughput_kbps(&self, stream_id: u64, bytes: u64) -> Result<u64, TelemetryError> {
        let pattern = Regex::new(&format!(r#""stream_id":{stream_id}\b"#))?;

        let times: Vec<f64> = self
            .trace
            .lines()
            .iter()
            .filter(|line| pattern.is_match(line))
            .filter_map(|line| serde_json::from_str::<PacketRecord>(line).ok())
            .filter(PacketRecord::is_complete)
            .filter_map(|record| record.time)
            .collect();

        let insufficient = || TelemetryError::InsufficientSamples {
            stream_id,
            matched: times.len(),
        };
        if times.len() < 2 {
            return Err(insufficient());
        }
        let (start, end) = times
            .iter()
            .copied()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        let span_ms = end - start;
        if span_ms <= 0.0 {
            return Err(insufficient());
        }

        let kbps = bytes as f64 * 8.0 / span_ms;
        trace!(stream_id, bytes, span_ms, kbps, "Stream throughput");
        Ok(kbps as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::qlog::tests::{mock_source, HEADER};
    use chrono::TimeDelta;

    fn metrics(time: f64, rtt: f64, bytes: u64) -> String {
        format!(
            r#"{{"time":{time},"name":"recovery:metrics_updated","data":{{"smoothed_rtt":{rtt},"bytes_in_flight":{bytes}}}}}"#
        )
    }

    fn packet(time: f64, stream_id: u64, length: u64) -> String {
        format!(
            r#"{{"time":{time},"name":"transport:packet_sent","data":{{"header":{{"packet_type":"1RTT","packet_number":1}},"raw":{{"length":{length}}},"frames":[{{"frame_type":"stream","stream_id":{stream_id},"offset":0,"length":{length}}}]}}}}"#
        )
    }

    fn estimator(lines: Vec<String>) -> ThroughputEstimator {
        let mut all = vec![HEADER.to_string()];
        all.extend(lines);
        ThroughputEstimator::from_source(&mock_source(all)).unwrap()
    }

    fn at(estimator: &ThroughputEstimator, offset_ms: i64) -> DateTime<Utc> {
        estimator.trace().reference_time() + TimeDelta::milliseconds(offset_ms)
    }

    #[test]
    fn test_connection_mean_over_window() {
        let est = estimator(vec![
            metrics(5.0, 10.0, 1_000),   // 800 kbps, before window
            metrics(10.0, 10.0, 1_250),  // 1000 kbps
            metrics(20.0, 20.0, 1_250),  // 500 kbps
            metrics(30.0, 10.0, 5_000),  // at window end, excluded
        ]);

        let kbps = est
            .connection_throughput_kbps(at(&est, 10), at(&est, 30))
            .unwrap();
        assert_eq!(kbps, 750);

        let query = ThroughputQuery::Connection {
            from: at(&est, 10),
            to: at(&est, 30),
        };
        assert_eq!(est.estimate(&query).unwrap(), 750);
    }

    #[test]
    fn test_empty_window_is_no_estimate() {
        let est = estimator(vec![metrics(10.0, 10.0, 1_250)]);
        assert!(matches!(
            est.connection_throughput_kbps(at(&est, 100), at(&est, 200)),
            Err(TelemetryError::EmptyWindow)
        ));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let est = estimator(vec![metrics(10.0, 10.0, 1_250)]);
        assert!(matches!(
            est.connection_throughput_kbps(at(&est, 20), at(&est, 10)),
            Err(TelemetryError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_stream_span() {
        let est = estimator(vec![
            packet(100.0, 4, 1_200),
            packet(110.0, 8, 1_200),
            packet(125.0, 4, 1_200),
            packet(150.0, 4, 600),
            packet(160.0, 40, 1_200),
        ]);

        // 10_000 bytes over 50 ms
        assert_eq!(est.stream_throughput_kbps(4, 10_000).unwrap(), 1_600);
        assert_eq!(
            est.estimate(&ThroughputQuery::Stream {
                stream_id: 4,
                bytes: 10_000
            })
            .unwrap(),
            1_600
        );
    }

    #[test]
    fn test_stream_span_uses_earliest_and_latest_time() {
        let est = estimator(vec![
            packet(150.0, 4, 600),
            packet(100.0, 4, 1_200),
            packet(125.0, 4, 1_200),
        ]);

        // 10_000 bytes over 100..150 ms
        assert_eq!(est.stream_throughput_kbps(4, 10_000).unwrap(), 1_600);
    }

    #[test]
    fn test_stream_needs_two_records() {
        let est = estimator(vec![packet(100.0, 4, 1_200), packet(110.0, 8, 1_200)]);
        assert!(matches!(
            est.stream_throughput_kbps(4, 1_000),
            Err(TelemetryError::InsufficientSamples { stream_id: 4, matched: 1 })
        ));
        assert!(matches!(
            est.stream_throughput_kbps(12, 1_000),
            Err(TelemetryError::InsufficientSamples { matched: 0, .. })
        ));
    }

    #[test]
    fn test_stream_ignores_incomplete_records() {
        let est = estimator(vec![
            packet(100.0, 4, 1_200),
            // no raw length
            r#"{"time":120,"data":{"frames":[{"stream_id":4}]}}"#.to_string(),
            packet(100.0, 4, 1_200),
        ]);
        assert!(matches!(
            est.stream_throughput_kbps(4, 1_000),
            Err(TelemetryError::InsufficientSamples { matched: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_qlog_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server-1.qlog");
        let body = [HEADER.to_string(), metrics(1.0, 10.0, 1_250)]
            .iter()
            .map(|line| format!("\x1e{line}\n"))
            .collect::<String>();
        std::fs::write(&path, body).unwrap();

        let est = ThroughputEstimator::load_qlog(&path).await.unwrap();
        assert_eq!(est.trace().samples().len(), 1);
        assert_eq!(
            est.connection_throughput_kbps(at(&est, 0), at(&est, 2)).unwrap(),
            1_000
        );

        let missing = ThroughputEstimator::load_qlog(dir.path().join("nope.qlog")).await;
        assert!(matches!(missing, Err(TelemetryError::Io(_))));
    }
}
