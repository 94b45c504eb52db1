use std::sync::Arc;

use bytes::Bytes;
use moqabr_wire::ChunkEnvelope;
use tracing::{debug, warn};

use crate::cache::{ObjectHeader, ObjectStore, StoredObject};
use crate::error::RelayResult;
use crate::telemetry::{ThroughputEstimator, ThroughputQuery};

/// What a consumer receives for one stream key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub bitrate_kbps: u64,
    /// `None` when telemetry gave no estimate and the lowest rung was used
    pub estimated_kbps: Option<u64>,
    /// Encoded chunk envelope as stored
    pub unit: Bytes,
    pub complete: bool,
}

impl Delivery {
    pub fn chunk(&self) -> RelayResult<ChunkEnvelope> {
        Ok(ChunkEnvelope::decode(self.unit.clone())?)
    }
}

/// Producer/consumer pipeline over a shared [`ObjectStore`]
#[derive(Clone)]
pub struct Relay {
    store: Arc<ObjectStore>,
    object_ttl_secs: i64,
}

impl Relay {
    #[must_use]
    pub const fn new(store: Arc<ObjectStore>, object_ttl_secs: i64) -> Self {
        Self {
            store,
            object_ttl_secs,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    #[must_use]
    pub const fn object_ttl_secs(&self) -> i64 {
        self.object_ttl_secs
    }

    /// Store `chunk` under `stream_key` at every ladder rung.
    ///
    /// Variants share one encoded unit; the transcoder that would produce
    /// per-rung renditions sits outside this crate.
    pub fn ingest(
        &self,
        stream_key: &str,
        header: &ObjectHeader,
        chunk: &ChunkEnvelope,
    ) -> RelayResult<()> {
        let unit = chunk.encode()?;
        let variants = self.store.create(stream_key, header, self.object_ttl_secs)?;

        for object in variants.values() {
            let appended = object.append(&unit);
            debug_assert!(appended, "fresh variant refused its payload");
            object.finish();
        }

        debug!(
            stream_key,
            chunk = %chunk,
            id = chunk.process_local_id(),
            bytes = unit.len(),
            "Ingested chunk"
        );
        Ok(())
    }

    /// Pick the variant for one consumer.
    ///
    /// Telemetry failures mean the bandwidth is unknown: the lowest rung is
    /// served instead of failing the stream.
    pub fn serve(
        &self,
        stream_key: &str,
        telemetry: Option<&ThroughputEstimator>,
        query: &ThroughputQuery,
    ) -> RelayResult<Delivery> {
        let estimated_kbps = telemetry.and_then(|estimator| match estimator.estimate(query) {
            Ok(kbps) => Some(kbps),
            Err(e) => {
                warn!(stream_key, error = %e, "No throughput estimate, serving lowest variant");
                None
            }
        });

        let (bitrate_kbps, object) = self.store.fetch(stream_key, estimated_kbps.unwrap_or(0))?;

        debug!(
            stream_key,
            bitrate_kbps,
            estimated_kbps,
            "Selected variant"
        );
        Ok(Delivery {
            bitrate_kbps,
            estimated_kbps,
            unit: object.payload(),
            complete: object.is_end_of_stream(),
        })
    }
}
