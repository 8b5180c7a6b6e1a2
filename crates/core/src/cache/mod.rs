//! SQLite-backed store for cache generations and their entries.
//!
//! This module provides a persistent, versioned response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named generations, one of which is marked activated
//! - Entries keyed by a SHA-256 digest of method and URL
//! - All-or-nothing population of a generation
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod sync;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use generations::Generation;
