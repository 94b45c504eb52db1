//! Bootstrap helpers for starting the relay process

pub mod config;

pub use config::load_config;
