//! qlog traces written by the QUIC transport
//!
//! The transport writes one JSON-SEQ file per connection. The first record
//! carries the connection's reference time (milliseconds since the UNIX
//! epoch); every event after it has a `time` offset in milliseconds from
//! that reference.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TelemetryError;

/// JSON-SEQ record separator
const RECORD_SEPARATOR: char = '\x1e';

/// Reference time must appear within the first few records
const REFERENCE_TIME_SCAN_LINES: usize = 8;

const REFERENCE_TIME_POINTERS: [&str; 2] = ["/trace/common_fields/reference_time", "/reference_time"];

/// Line-oriented telemetry input.
#[cfg_attr(test, automock)]
pub trait TelemetrySource: Send + Sync {
    /// Every record of the trace, in file order.
    fn read_lines(&self) -> Result<Vec<String>, TelemetryError>;
}

/// qlog file on disk. Reads block.
#[derive(Debug, Clone)]
pub struct QlogFile {
    path: PathBuf,
}

impl QlogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySource for QlogFile {
    fn read_lines(&self) -> Result<Vec<String>, TelemetryError> {
        let file = fs::File::open(&self.path)?;
        let lines = BufReader::new(file).lines().collect::<io::Result<Vec<_>>>()?;
        Ok(lines)
    }
}

/// `{dir}/{perspective}-{connection_id}.qlog`
pub fn qlog_path(dir: impl AsRef<Path>, perspective: &str, connection_id: &str) -> PathBuf {
    dir.as_ref().join(format!("{perspective}-{connection_id}.qlog"))
}

/// Remove every trace in `dir`. A missing directory is not an error.
pub fn clear_qlog_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "Cleared qlog directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir)
}

/// One congestion-controller observation
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Milliseconds since the trace's reference time
    pub offset_ms: f64,
    pub smoothed_rtt_ms: f64,
    pub bytes_in_flight: u64,
    pub packets_in_flight: Option<u64>,
    pub event: String,
}

impl TelemetrySample {
    /// bytes_in_flight × 8 ÷ RTT, in kbit/s. `None` for a zero RTT.
    #[must_use]
    pub fn throughput_kbps(&self) -> Option<f64> {
        (self.smoothed_rtt_ms > 0.0).then(|| self.bytes_in_flight as f64 * 8.0 / self.smoothed_rtt_ms)
    }
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    time: Option<f64>,
    name: Option<String>,
    data: Option<MetricsData>,
}

#[derive(Debug, Deserialize)]
struct MetricsData {
    smoothed_rtt: Option<f64>,
    bytes_in_flight: Option<u64>,
    packets_in_flight: Option<u64>,
}

/// Packet event as it appears for stream frames
#[derive(Debug, Deserialize)]
pub(crate) struct PacketRecord {
    pub(crate) time: Option<f64>,
    data: Option<PacketData>,
}

#[derive(Debug, Deserialize)]
struct PacketData {
    raw: Option<RawInfo>,
    frames: Option<Vec<FrameInfo>>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    length: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FrameInfo {
    stream_id: Option<i64>,
}

impl PacketRecord {
    /// A packet record is usable when it has a time, a raw length and every
    /// frame names its stream.
    pub(crate) fn is_complete(&self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        self.time.is_some()
            && data.raw.as_ref().is_some_and(|raw| raw.length.is_some())
            && data
                .frames
                .as_ref()
                .is_some_and(|frames| frames.iter().all(|f| f.stream_id.is_some()))
    }
}

/// A parsed connection trace
#[derive(Debug, Clone)]
pub struct QlogTrace {
    reference_time: DateTime<Utc>,
    samples: Vec<TelemetrySample>,
    lines: Vec<String>,
}

impl QlogTrace {
    /// Read and parse a trace.
    ///
    /// Fails when the reference time is absent or malformed. Records that
    /// are not valid JSON are skipped.
    pub fn load(source: &dyn TelemetrySource) -> Result<Self, TelemetryError> {
        let lines: Vec<String> = source
            .read_lines()?
            .into_iter()
            .map(|line| line.trim_start_matches(RECORD_SEPARATOR).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        let reference_time = find_reference_time(&lines)?;

        let mut samples = Vec::new();
        let mut smoothed_rtt = None;
        let mut bytes_in_flight = None;
        let mut skipped = 0usize;

        for line in &lines {
            let record: EventRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            let (Some(time), Some(data)) = (record.time, record.data) else {
                continue;
            };
            if data.smoothed_rtt.is_none() && data.bytes_in_flight.is_none() {
                continue;
            }

            // Metric updates are partial; carry the last known values forward.
            smoothed_rtt = data.smoothed_rtt.or(smoothed_rtt);
            bytes_in_flight = data.bytes_in_flight.or(bytes_in_flight);

            if let (Some(rtt), Some(bytes)) = (smoothed_rtt, bytes_in_flight) {
                samples.push(TelemetrySample {
                    offset_ms: time,
                    smoothed_rtt_ms: rtt,
                    bytes_in_flight: bytes,
                    packets_in_flight: data.packets_in_flight,
                    event: record.name.unwrap_or_default(),
                });
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped unparseable qlog records");
        }
        debug!(
            reference_time = %reference_time,
            records = lines.len(),
            samples = samples.len(),
            "Loaded qlog trace"
        );

        Ok(Self {
            reference_time,
            samples,
            lines,
        })
    }

    #[must_use]
    pub const fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    #[must_use]
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Raw records, separators stripped
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Offset of `at` from the reference time, in milliseconds.
    #[must_use]
    pub fn offset_ms(&self, at: DateTime<Utc>) -> f64 {
        let delta = at - self.reference_time;
        delta
            .num_microseconds()
            .map_or_else(|| delta.num_milliseconds() as f64, |us| us as f64 / 1_000.0)
    }
}

fn find_reference_time(lines: &[String]) -> Result<DateTime<Utc>, TelemetryError> {
    for line in lines.iter().take(REFERENCE_TIME_SCAN_LINES) {
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(raw) = REFERENCE_TIME_POINTERS
            .iter()
            .find_map(|pointer| value.pointer(pointer))
        else {
            continue;
        };

        let millis = raw
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .ok_or_else(|| TelemetryError::MalformedReferenceTime(raw.to_string()))?;

        return DateTime::from_timestamp_micros((millis * 1_000.0).round() as i64)
            .ok_or_else(|| TelemetryError::MalformedReferenceTime(raw.to_string()));
    }

    Err(TelemetryError::MissingReferenceTime)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str = r#"{"qlog_version":"draft-02","qlog_format":"JSON-SEQ","title":"quic-go qlog","trace":{"vantage_point":{"type":"server"},"common_fields":{"ODCID":"c2d1","group_id":"c2d1","reference_time":1700000000000.5}}}"#;

    pub(crate) fn mock_source(lines: Vec<String>) -> MockTelemetrySource {
        let mut source = MockTelemetrySource::new();
        source.expect_read_lines().returning(move || Ok(lines.clone()));
        source
    }

    fn metrics(time: f64, data: &str) -> String {
        format!(r#"{{"time":{time},"name":"recovery:metrics_updated","data":{data}}}"#)
    }

    #[test]
    fn test_reference_time_from_common_fields() {
        let source = mock_source(vec![format!("\x1e{HEADER}")]);
        let trace = QlogTrace::load(&source).unwrap();

        assert_eq!(trace.reference_time().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(trace.reference_time().timestamp_subsec_micros(), 500);
        assert!(trace.samples().is_empty());
    }

    #[test]
    fn test_reference_time_at_top_level() {
        let source = mock_source(vec![r#"{"reference_time":1000}"#.to_string()]);
        let trace = QlogTrace::load(&source).unwrap();
        assert_eq!(trace.reference_time().timestamp_millis(), 1_000);
    }

    #[test]
    fn test_missing_reference_time() {
        let source = mock_source(vec![metrics(1.0, r#"{"smoothed_rtt":10,"bytes_in_flight":100}"#)]);
        assert!(matches!(
            QlogTrace::load(&source).unwrap_err(),
            TelemetryError::MissingReferenceTime
        ));
    }

    #[test]
    fn test_malformed_reference_time() {
        let source = mock_source(vec![
            r#"{"trace":{"common_fields":{"reference_time":"yesterday"}}}"#.to_string(),
        ]);
        assert!(matches!(
            QlogTrace::load(&source).unwrap_err(),
            TelemetryError::MalformedReferenceTime(_)
        ));
    }

    #[test]
    fn test_partial_metric_updates_carry_forward() {
        let source = mock_source(vec![
            HEADER.to_string(),
            metrics(1.0, r#"{"bytes_in_flight":1000}"#),
            metrics(2.0, r#"{"smoothed_rtt":20.0,"bytes_in_flight":2000,"packets_in_flight":2}"#),
            metrics(3.0, r#"{"bytes_in_flight":4000}"#),
            "not json".to_string(),
            metrics(4.0, r#"{"smoothed_rtt":40.0}"#),
        ]);
        let trace = QlogTrace::load(&source).unwrap();

        let samples = trace.samples();
        assert_eq!(samples.len(), 3);
        assert_eq!((samples[0].smoothed_rtt_ms, samples[0].bytes_in_flight), (20.0, 2000));
        assert_eq!(samples[0].packets_in_flight, Some(2));
        assert_eq!((samples[1].smoothed_rtt_ms, samples[1].bytes_in_flight), (20.0, 4000));
        assert_eq!((samples[2].smoothed_rtt_ms, samples[2].bytes_in_flight), (40.0, 4000));
        assert_eq!(samples[2].event, "recovery:metrics_updated");
        assert_eq!(samples[1].throughput_kbps(), Some(1600.0));
    }

    #[test]
    fn test_io_error_propagates() {
        let mut source = MockTelemetrySource::new();
        source
            .expect_read_lines()
            .returning(|| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into()));
        assert!(matches!(
            QlogTrace::load(&source).unwrap_err(),
            TelemetryError::Io(_)
        ));
    }

    #[test]
    fn test_qlog_file_and_directory_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let qlog_dir = dir.path().join("qlog");
        clear_qlog_dir(&qlog_dir).unwrap();

        let path = qlog_path(&qlog_dir, "server", "8f3a");
        assert_eq!(path.file_name().unwrap(), "server-8f3a.qlog");
        fs::write(&path, format!("\x1e{HEADER}\n")).unwrap();

        let trace = QlogTrace::load(&QlogFile::new(&path)).unwrap();
        assert_eq!(trace.lines().len(), 1);

        clear_qlog_dir(&qlog_dir).unwrap();
        assert!(qlog_dir.exists());
        assert!(!path.exists());
    }
}
