//! State management for subscribed workflows.
//!
//! This module provides:
//! - `UpdateAggregator`, which folds stream events and snapshots into state
//! - The shared, observable handle the client and dispatch task use

pub mod aggregator;

pub use aggregator::{AggregatedState, SharedAggregator, StateListener, UpdateAggregator};
