mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use moqabr_core::{bootstrap::load_config, logging, Config};

use server::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "moqabr")]
#[command(about = "Adaptive-bitrate object cache for a MoQ relay", long_about = None)]
struct Args {
    /// Config file (yaml, toml or json)
    #[arg(long, env = "MOQABR_CONFIG_PATH")]
    config: Option<String>,

    /// Lifetime of finished objects in seconds (negative disables expiry)
    #[arg(long, env = "OBJ_EXP_SECS", allow_negative_numbers = true)]
    obj_exp_secs: Option<i64>,

    /// Cache cleanup period in milliseconds (0 disables cleanup)
    #[arg(long, env = "CACHE_CLEANUP_PERIOD_MS")]
    cache_cleanup_period_ms: Option<u64>,

    /// Directory the transport writes qlog traces to
    #[arg(long, env = "QLOG_DIR")]
    qlog_dir: Option<String>,
}

impl Args {
    /// Flags win over the config file and `MOQABR_*` variables.
    fn apply(self, config: &mut Config) {
        if let Some(secs) = self.obj_exp_secs {
            config.cache.object_ttl_secs = secs;
        }
        if let Some(period) = self.cache_cleanup_period_ms {
            config.cache.cleanup_period_ms = period;
        }
        if let Some(dir) = self.qlog_dir {
            config.telemetry.qlog_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration (validated, fails fast)
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    info!("Starting moqabr relay cache v{}", env!("CARGO_PKG_VERSION"));
    info!(
        object_ttl_secs = config.cache.object_ttl_secs,
        cleanup_period_ms = config.cache.cleanup_period_ms,
        qlog_dir = %config.telemetry.qlog_dir,
        "Cache configuration"
    );

    // 3. Store, pipeline and housekeeping
    let server = RelayServer::start(&config)?;

    // 4. Run until Ctrl+C / SIGTERM
    server.run().await;

    Ok(())
}
