pub mod bootstrap;
pub mod config;
pub mod ladder;
pub mod logging;

pub use config::Config;
pub use ladder::{LadderError, QualityLadder, QualityLevel};
