//! High-level operations built on the engine and git wrappers.
//!
//! This module provides the multi-step workflows that the CLI exposes beyond
//! single engine invocations.

pub mod history;

// Re-export commonly used functions
pub use history::{restore_history, HistoryReport};
