use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use moqabr_core::QualityLadder;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::object::{MoqObject, StoredObject};
use crate::error::{RelayError, RelayResult};

/// Variants of one stream key, keyed by bitrate (kbps)
pub type Variants<O> = BTreeMap<u64, Arc<O>>;

/// Multi-variant object cache
///
/// Every stream key holds exactly one object per quality-ladder rung, all
/// created together. Lookups pick the largest rung at or below the
/// consumer's estimated throughput.
///
/// A single reader/writer lock guards the map: `create` and eviction take
/// it exclusively, lookups share it. Object payloads synchronize
/// themselves and are never written under this lock.
pub struct ObjectStore<O: StoredObject = MoqObject> {
    entries: RwLock<HashMap<String, Variants<O>>>,
    ladder: QualityLadder,
}

impl<O: StoredObject> ObjectStore<O> {
    #[must_use]
    pub fn new(ladder: QualityLadder) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ladder,
        }
    }

    #[must_use]
    pub const fn ladder(&self) -> &QualityLadder {
        &self.ladder
    }

    /// Allocate one object per ladder rung for `stream_key`.
    ///
    /// An existing key is never overwritten, partially or fully.
    pub fn create(
        &self,
        stream_key: &str,
        header: &O::Header,
        max_age_secs: i64,
    ) -> RelayResult<Variants<O>> {
        let mut entries = self.entries.write();
        if entries.contains_key(stream_key) {
            warn!(stream_key, "Refusing to override open object");
            return Err(RelayError::DuplicateKey(stream_key.to_string()));
        }

        let variants: Variants<O> = self
            .ladder
            .bitrates()
            .map(|bitrate| (bitrate, Arc::new(O::create(header.clone(), max_age_secs))))
            .collect();
        entries.insert(stream_key.to_string(), variants.clone());

        debug!(
            stream_key,
            variants = variants.len(),
            max_age_secs,
            "Created object variants"
        );
        Ok(variants)
    }

    /// Best-fit-below lookup.
    ///
    /// Returns the largest bitrate not above `estimated_kbps`, or the lowest
    /// bitrate when the estimate is below every rung. `None` only when the
    /// key is absent.
    #[must_use]
    pub fn get(&self, stream_key: &str, estimated_kbps: u64) -> Option<(u64, Arc<O>)> {
        let entries = self.entries.read();
        let variants = entries.get(stream_key)?;

        variants
            .range(..=estimated_kbps)
            .next_back()
            .or_else(|| variants.iter().next())
            .map(|(bitrate, object)| (*bitrate, Arc::clone(object)))
    }

    /// `get`, reporting a miss as `NotFound`.
    pub fn fetch(&self, stream_key: &str, estimated_kbps: u64) -> RelayResult<(u64, Arc<O>)> {
        self.get(stream_key, estimated_kbps)
            .ok_or_else(|| RelayError::NotFound(stream_key.to_string()))
    }

    /// Exact lookup of one rung.
    #[must_use]
    pub fn variant(&self, stream_key: &str, bitrate_kbps: u64) -> Option<Arc<O>> {
        self.entries
            .read()
            .get(stream_key)
            .and_then(|variants| variants.get(&bitrate_kbps))
            .cloned()
    }

    /// Bitrates stored for `stream_key`, ascending.
    #[must_use]
    pub fn bitrates(&self, stream_key: &str) -> Option<Vec<u64>> {
        self.entries
            .read()
            .get(stream_key)
            .map(|variants| variants.keys().copied().collect())
    }

    #[must_use]
    pub fn contains(&self, stream_key: &str) -> bool {
        self.entries.read().contains_key(stream_key)
    }

    /// Number of stream keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// One eviction pass.
    ///
    /// A key goes as a whole as soon as any of its variants is finished and
    /// older than its max age. Returns the number of keys removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        info!(entries = before, "Running cache cleanup");

        entries.retain(|stream_key, variants| {
            let expired = variants.values().any(|object| object.is_expired(now));
            if expired {
                info!(stream_key = %stream_key, "Evicting expired object");
            }
            !expired
        });

        let after = entries.len();
        info!(entries = after, evicted = before - after, "Cache cleanup finished");
        before - after
    }
}
