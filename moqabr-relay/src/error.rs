use moqabr_wire::{DecodeError, EncodeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("cannot override an open object: {0}")]
    DuplicateKey(String),

    #[error("Stream not found: {0}")]
    NotFound(String),

    #[error("Housekeeping task could not be started: {0}")]
    HousekeepingUnavailable(String),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Bandwidth is unknown; callers fall back to a conservative variant.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("qlog has no reference_time")]
    MissingReferenceTime,

    #[error("malformed reference_time: {0}")]
    MalformedReferenceTime(String),

    #[error("invalid query window: {0}")]
    InvalidWindow(String),

    #[error("invalid stream pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no telemetry samples in window")]
    EmptyWindow,

    #[error("stream {stream_id} matched {matched} qlog records, need at least 2 spanning a non-zero time")]
    InsufficientSamples { stream_id: u64, matched: usize },
}
