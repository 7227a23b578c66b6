//! # dx-core
//!
//! Core crate for the DX spot aggregator, providing:
//!
//! - **Types** (`types`): spot records, path records, source enums
//! - **Configuration** (`config`): JSON config deserialization with defaults
//! - **Error types** (`error`): domain-specific `DxError` via thiserror
//! - **Cache** (`cache`): TTL cache with stale-serving semantics
//! - **Coalescing** (`coalesce`): single-flight refresh sharing
//! - **Deduplication** (`dedup`): per-session `(call, freq)` dedup
//! - **Geolocation** (`geo`): callsign-prefix coordinate estimates
//! - **Logging** (`logging`): tracing-based structured logging

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod dedup;
pub mod error;
pub mod geo;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
