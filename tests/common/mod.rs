//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Sync context fixtures over an in-memory remote store
//! - A backoff sleeper that records delays instead of sleeping
//! - Helpers for waiting on the pending count

pub mod fixtures;
pub mod sleeper;

// Re-export commonly used utilities
pub use fixtures::*;
pub use sleeper::*;
