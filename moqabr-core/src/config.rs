use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ladder::{LadderError, QualityLadder, QualityLevel};
use crate::logging::LogFormat;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub quality_ladder: LadderConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max age assigned to every object created by the producer path.
    /// Negative values disable expiry.
    pub object_ttl_secs: i64,
    /// Housekeeping period (0 disables eviction)
    pub cleanup_period_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            object_ttl_secs: 3 * 60,
            cleanup_period_ms: 10 * 1000,
        }
    }
}

/// Ordered rungs every stream is stored at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LadderConfig(pub Vec<QualityLevel>);

impl Default for LadderConfig {
    fn default() -> Self {
        Self(QualityLevel::default_ladder())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directory the transport layer writes per-connection qlog files into
    pub qlog_dir: String,
    /// Wipe `qlog_dir` on startup
    pub clear_on_start: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            qlog_dir: "./data/qlog".to_string(),
            clear_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // MOQABR_CACHE__OBJECT_TTL_SECS, MOQABR_LOGGING__LEVEL, ...
        builder = builder.add_source(
            Environment::with_prefix("MOQABR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Build the validated, read-only ladder from the configured rungs.
    pub fn ladder(&self) -> Result<QualityLadder, LadderError> {
        QualityLadder::new(self.quality_ladder.0.clone())
    }

    /// Collect every misconfiguration instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.ladder() {
            errors.push(format!("quality_ladder: {e}"));
        }

        if self.logging.format.parse::<LogFormat>().is_err() {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got {:?}",
                self.logging.format
            ));
        }

        if self.telemetry.qlog_dir.trim().is_empty() {
            errors.push("telemetry.qlog_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
