use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::object::StoredObject;
use super::store::ObjectStore;
use crate::error::{RelayError, RelayResult};

/// Background eviction task for an [`ObjectStore`].
///
/// `stop` cancels the loop and waits for it to exit, so no eviction pass
/// can run after it returns. Dropping the handle cancels without waiting.
pub struct Housekeeper {
    handle: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
    period: Duration,
}

impl Housekeeper {
    /// Spawn the eviction loop on the current Tokio runtime.
    ///
    /// Returns `Ok(None)` when `period` is zero (housekeeping disabled).
    pub fn start<O: StoredObject>(
        store: Arc<ObjectStore<O>>,
        period: Duration,
    ) -> RelayResult<Option<Self>> {
        if period.is_zero() {
            info!("Cache cleanup disabled");
            return Ok(None);
        }

        let runtime = Handle::try_current()
            .map_err(|e| RelayError::HousekeepingUnavailable(e.to_string()))?;

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!("Cache cleanup task cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.evict_expired(Instant::now());
                    }
                }
            }
        });

        info!(period_ms = period.as_millis(), "Cache cleanup started");
        Ok(Some(Self {
            handle: Some(handle),
            shutdown,
            period,
        }))
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait until it has exited.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(()) => info!("Cache cleanup stopped"),
                Err(e) => warn!(error = %e, "Cache cleanup task ended abnormally"),
            }
        }
    }
}

impl Drop for Housekeeper {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
