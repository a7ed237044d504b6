//! Client Module
//!
//! The offline-first sync engine: local durable store, offline mutations,
//! remote store adapters and the sync service, wired together by
//! [`context::SyncContext`].

pub mod context;
pub mod local_db;
pub mod offline;
pub mod remote;
pub mod sync;

pub use context::{SyncContext, SyncContextBuilder};
