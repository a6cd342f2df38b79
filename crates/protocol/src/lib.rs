//! # sw-protocol
//!
//! Data models shared by every stagewatch crate.
//!
//! This crate defines:
//! - The JSON frames exchanged over the workflow event stream
//! - The normalized stage events the aggregator folds
//! - The snapshot returned by the workflow status endpoint
//! - The read-only view handed to consumers
//! - The `.stagewatch/config.toml` file model
//!
//! ## Modules
//!
//! - [`wire_models`]: Inbound and outbound stream frames
//! - [`stage_models`]: Normalized stage update events
//! - [`snapshot_models`]: Point-in-time workflow snapshot
//! - [`state_models`]: Connection/workflow status and the consumer view
//! - [`config_models`]: Settings from `config.toml`
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, chrono and ts-rs
//! - TypeScript generation: consumer-facing types derive `TS`
//! - Independent compilation: no dependencies on other stagewatch crates

pub mod config_models;
pub mod snapshot_models;
pub mod stage_models;
pub mod state_models;
pub mod wire_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use snapshot_models::*;
pub use stage_models::*;
pub use state_models::*;
pub use wire_models::*;
