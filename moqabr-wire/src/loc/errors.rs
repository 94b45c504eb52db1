use crate::{bytesio::bytes_errors::BytesWriteError, varint::VarIntError};

/// Encoding failures are caller bugs: the unit must not be sent.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("overflow encoding {field}: {value} is larger than 53 bit")]
    Overflow { field: &'static str, value: u64 },
    #[error("varint error in {field}: {source}")]
    VarInt {
        field: &'static str,
        #[source]
        source: VarIntError,
    },
    #[error("write error: {0}")]
    Write(#[from] BytesWriteError),
}

impl EncodeError {
    pub(crate) fn field(field: &'static str, err: VarIntError) -> Self {
        match err {
            VarIntError::Overflow(value) => Self::Overflow { field, value },
            source => Self::VarInt { field, source },
        }
    }
}

/// Decoding failures discard the unit; the connection carries on.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid mediaType code {0}")]
    InvalidMediaType(u64),
    #[error("invalid chunkType code {0}")]
    InvalidChunkType(u64),
    #[error("malformed {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: VarIntError,
    },
    #[error("metadata declares {declared} bytes but only {available} remain")]
    ShortMetaData { declared: u64, available: usize },
}

impl DecodeError {
    pub(crate) fn field(field: &'static str, source: VarIntError) -> Self {
        Self::Field { field, source }
    }
}

/// Unknown textual tag from a producer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTagError {
    #[error("invalid mediaType: {0}")]
    MediaType(String),
    #[error("invalid chunkType: {0}")]
    ChunkType(String),
}
