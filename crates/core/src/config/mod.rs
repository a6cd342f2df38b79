//! Configuration loading and management.
//!
//! This module loads client settings from the `.stagewatch/` directory and
//! validates them before a client is built.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::ClientConfig;
