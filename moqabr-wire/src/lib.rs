//! moqabr-wire - wire format for cached media chunks
//!
//! - bytesio/ - bounded reader and growable writer over `bytes` buffers
//! - varint   - 1/2/4/8-byte variable-length integers capped at 53 bits
//! - loc/     - chunk envelope (media type, chunk type, timing, metadata, payload)

pub mod bytesio;
pub mod loc;
pub mod varint;

pub use loc::{
    define::{ChunkType, MediaType},
    errors::{DecodeError, EncodeError, ParseTagError},
    ChunkEnvelope,
};
