// moqabr-relay - adaptive-bitrate object cache for a media relay
//
// Architecture:
// - cache/      - stored objects, the multi-variant object store and its housekeeping task
// - telemetry/  - qlog parsing and throughput estimation
// - relay       - producer/consumer pipeline tying codec, store and estimator together
//
// Every stream key is stored once per quality-ladder rung; consumers get the
// largest rung that fits their estimated throughput.

pub mod cache;
pub mod error;
pub mod relay;
pub mod telemetry;

pub use cache::{Housekeeper, MoqObject, ObjectHeader, ObjectStore, StoredObject};
pub use error::{RelayError, RelayResult, TelemetryError};
pub use relay::{Delivery, Relay};
pub use telemetry::{QlogFile, QlogTrace, TelemetrySample, TelemetrySource, ThroughputEstimator, ThroughputQuery};
