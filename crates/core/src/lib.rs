//! # sw-core
//!
//! Workflow subscription engine for stagewatch.
//!
//! This crate provides:
//! - Configuration loading from the `.stagewatch/` directory
//! - A transport abstraction with a WebSocket implementation
//! - Snapshot loading over HTTP
//! - A connection manager with fixed-delay reconnects and liveness pings
//! - Aggregation of stage events into observable workflow state
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`transport`]: Transport trait, WebSocket and mock implementations
//! - [`snapshot`]: Snapshot loader trait, HTTP and static implementations
//! - [`codec`]: Inbound frame decoding
//! - [`connection`]: Connection lifecycle and reconnect loop
//! - [`state`]: Aggregated workflow state
//! - [`client`]: Consumer-facing `WorkflowClient`

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod snapshot;
pub mod state;
pub mod transport;

pub use client::WorkflowClient;
