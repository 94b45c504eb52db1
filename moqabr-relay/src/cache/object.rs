// Stored objects
//
// The store only needs four facts about an object: end-of-stream, receipt
// time, max age and payload. `StoredObject` is that contract; `MoqObject`
// is the in-memory implementation the relay uses.

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub trait StoredObject: Send + Sync + 'static {
    type Header: Clone + Send + Sync;

    fn create(header: Self::Header, max_age_secs: i64) -> Self
    where
        Self: Sized;

    fn is_end_of_stream(&self) -> bool;

    fn received_at(&self) -> Instant;

    /// Negative disables expiry.
    fn max_age_secs(&self) -> i64;

    fn payload(&self) -> Bytes;

    /// Finished objects older than their max age are expired.
    fn is_expired(&self, now: Instant) -> bool {
        let Ok(max_age) = u64::try_from(self.max_age_secs()) else {
            return false;
        };
        self.is_end_of_stream()
            && now.saturating_duration_since(self.received_at()) > Duration::from_secs(max_age)
    }
}

/// Identity of one object inside a track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeader {
    pub track_id: String,
    pub group_seq: u64,
    pub object_seq: u64,
    pub send_order: u64,
}

/// In-memory object filled by the producer path.
///
/// Payload growth and the end-of-stream flag are synchronized internally, so
/// writers never need the store's lock.
#[derive(Debug)]
pub struct MoqObject {
    header: ObjectHeader,
    received_at: Instant,
    max_age_secs: i64,
    eof: AtomicBool,
    payload: RwLock<BytesMut>,
}

impl MoqObject {
    #[must_use]
    pub fn new(header: ObjectHeader, max_age_secs: i64) -> Self {
        Self {
            header,
            received_at: Instant::now(),
            max_age_secs,
            eof: AtomicBool::new(false),
            payload: RwLock::new(BytesMut::new()),
        }
    }

    #[must_use]
    pub const fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Append producer bytes. Returns false, dropping the bytes, once the
    /// object is finished.
    #[must_use]
    pub fn append(&self, data: &[u8]) -> bool {
        let mut payload = self.payload.write();
        if self.eof.load(Ordering::Acquire) {
            tracing::warn!(
                track = %self.header.track_id,
                group_seq = self.header.group_seq,
                object_seq = self.header.object_seq,
                "Dropping write to finished object"
            );
            return false;
        }
        payload.extend_from_slice(data);
        true
    }

    /// Mark end-of-stream; no more bytes will be accepted.
    pub fn finish(&self) {
        let _payload = self.payload.write();
        self.eof.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StoredObject for MoqObject {
    type Header = ObjectHeader;

    fn create(header: Self::Header, max_age_secs: i64) -> Self {
        Self::new(header, max_age_secs)
    }

    fn is_end_of_stream(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    fn received_at(&self) -> Instant {
        self.received_at
    }

    fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    fn payload(&self) -> Bytes {
        self.payload.read().clone().freeze()
    }
}
