use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use moqabr_core::Config;
use moqabr_relay::{telemetry::clear_qlog_dir, Housekeeper, ObjectStore, Relay};

/// Running relay process: the shared store, the ingest/serve pipeline and
/// the eviction task.
pub struct RelayServer {
    relay: Relay,
    housekeeper: Option<Housekeeper>,
}

impl RelayServer {
    /// Build the store and start housekeeping. Must run inside the runtime.
    pub fn start(config: &Config) -> Result<Self> {
        if config.telemetry.clear_on_start {
            clear_qlog_dir(&config.telemetry.qlog_dir)
                .with_context(|| format!("Failed to clear qlog dir {}", config.telemetry.qlog_dir))?;
            info!(dir = %config.telemetry.qlog_dir, "qlog directory ready");
        }

        let ladder = config.ladder()?;
        info!(
            rungs = ladder.len(),
            bitrates = ?ladder.bitrates().collect::<Vec<_>>(),
            "Quality ladder loaded"
        );

        let store = Arc::new(ObjectStore::new(ladder));
        let housekeeper = Housekeeper::start(
            Arc::clone(&store),
            Duration::from_millis(config.cache.cleanup_period_ms),
        )?;

        Ok(Self {
            relay: Relay::new(store, config.cache.object_ttl_secs),
            housekeeper,
        })
    }

    #[must_use]
    pub const fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Wait for Ctrl+C or SIGTERM, then stop housekeeping.
    pub async fn run(self) {
        info!(
            object_ttl_secs = self.relay.object_ttl_secs(),
            "Relay cache running, press Ctrl+C to stop"
        );
        shutdown_signal().await;
        self.shutdown().await;
    }

    pub async fn shutdown(self) {
        info!(
            cached_streams = self.relay.store().len(),
            "Shutting down relay cache"
        );
        match self.housekeeper {
            Some(housekeeper) => housekeeper.stop().await,
            None => warn!("Cache cleanup was disabled, nothing to stop"),
        }
        info!("Shutdown complete");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
