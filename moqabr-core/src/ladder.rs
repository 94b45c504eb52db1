//! Quality ladder
//!
//! The fixed set of bitrate/resolution presets every stream is stored at.
//! Built once from configuration at startup and shared read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One rung of the ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Target bitrate in kbps; also the variant's lookup key in the object store
    pub bitrate_kbps: u64,
    /// Target resolution, e.g. "640x360"
    pub resolution: String,
    /// Rate-control ceiling in kbps
    pub max_rate_kbps: u64,
    /// Rate-control buffer size in kb
    pub buf_size_kb: u64,
}

impl QualityLevel {
    #[must_use]
    pub fn new(bitrate_kbps: u64, resolution: &str, max_rate_kbps: u64, buf_size_kb: u64) -> Self {
        Self {
            bitrate_kbps,
            resolution: resolution.to_string(),
            max_rate_kbps,
            buf_size_kb,
        }
    }

    /// Three rungs: 144p/100k, 360p/500k, 1080p/1000k
    #[must_use]
    pub fn default_ladder() -> Vec<Self> {
        vec![
            Self::new(100, "256x144", 100, 150),
            Self::new(500, "640x360", 500, 750),
            Self::new(1_000, "1920x1080", 1_000, 1_500),
        ]
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LadderError {
    #[error("ladder has no quality levels")]
    Empty,

    #[error("quality level {resolution} has a zero bitrate")]
    ZeroBitrate { resolution: String },

    #[error("bitrate {0} kbps appears more than once")]
    DuplicateBitrate(u64),
}

/// Validated ladder, sorted by ascending bitrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityLadder {
    levels: Vec<QualityLevel>,
}

impl QualityLadder {
    pub fn new(mut levels: Vec<QualityLevel>) -> Result<Self, LadderError> {
        if levels.is_empty() {
            return Err(LadderError::Empty);
        }

        let mut seen = HashSet::with_capacity(levels.len());
        for level in &levels {
            if level.bitrate_kbps == 0 {
                return Err(LadderError::ZeroBitrate {
                    resolution: level.resolution.clone(),
                });
            }
            if !seen.insert(level.bitrate_kbps) {
                return Err(LadderError::DuplicateBitrate(level.bitrate_kbps));
            }
        }

        levels.sort_by_key(|level| level.bitrate_kbps);
        Ok(Self { levels })
    }

    #[must_use]
    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn bitrates(&self) -> impl Iterator<Item = u64> + '_ {
        self.levels.iter().map(|level| level.bitrate_kbps)
    }

    #[must_use]
    pub fn lowest(&self) -> &QualityLevel {
        // Non-empty by construction
        &self.levels[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for QualityLadder {
    fn default() -> Self {
        Self {
            levels: QualityLevel::default_ladder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let ladder = QualityLadder::default();
        assert_eq!(ladder.bitrates().collect::<Vec<_>>(), vec![100, 500, 1000]);
        assert_eq!(ladder.lowest().resolution, "256x144");
    }

    #[test]
    fn test_ladder_is_sorted() {
        let ladder = QualityLadder::new(vec![
            QualityLevel::new(1_000, "1920x1080", 1_000, 1_500),
            QualityLevel::new(100, "256x144", 100, 150),
        ])
        .unwrap();
        assert_eq!(ladder.bitrates().collect::<Vec<_>>(), vec![100, 1000]);
    }

    #[test]
    fn test_ladder_rejects_bad_input() {
        assert_eq!(QualityLadder::new(Vec::new()), Err(LadderError::Empty));
        assert_eq!(
            QualityLadder::new(vec![QualityLevel::new(0, "256x144", 0, 0)]),
            Err(LadderError::ZeroBitrate {
                resolution: "256x144".to_string()
            })
        );
        assert_eq!(
            QualityLadder::new(vec![
                QualityLevel::new(500, "640x360", 500, 750),
                QualityLevel::new(500, "854x480", 500, 750),
            ]),
            Err(LadderError::DuplicateBitrate(500))
        );
    }
}
