use std::io;

#[derive(Debug, thiserror::Error)]
pub enum BytesReadErrorValue {
    #[error("not enough bytes to read: need {needed}, have {available}")]
    NotEnoughBytes { needed: usize, available: usize },
    #[error("empty stream")]
    EmptyStream,
    #[error("io error: {0}")]
    IO(#[source] io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct BytesReadError {
    pub value: BytesReadErrorValue,
}

impl From<BytesReadErrorValue> for BytesReadError {
    fn from(val: BytesReadErrorValue) -> Self {
        Self { value: val }
    }
}

impl From<io::Error> for BytesReadError {
    fn from(error: io::Error) -> Self {
        Self {
            value: BytesReadErrorValue::IO(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{value}")]
pub struct BytesWriteError {
    pub value: BytesWriteErrorValue,
}

#[derive(Debug, thiserror::Error)]
pub enum BytesWriteErrorValue {
    #[error("io error: {0}")]
    IO(io::Error),
}

impl From<io::Error> for BytesWriteError {
    fn from(error: io::Error) -> Self {
        Self {
            value: BytesWriteErrorValue::IO(error),
        }
    }
}
