//! Connection telemetry
//!
//! `qlog` turns a transport trace into samples; `estimator` reduces them to
//! the throughput figure the store's lookup takes. All figures are kbit/s.

mod estimator;
mod qlog;

pub use estimator::{ThroughputEstimator, ThroughputQuery};
pub use qlog::{clear_qlog_dir, qlog_path, QlogFile, QlogTrace, TelemetrySample, TelemetrySource};
