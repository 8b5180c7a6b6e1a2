//! Cache maintenance MCP tools.
//!
//! This module provides read-only views of the generation store.

pub mod keys;

pub use keys::{CacheKeysParams, keys_impl};
