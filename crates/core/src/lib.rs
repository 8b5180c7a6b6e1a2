//! Core types and shared functionality for portal-offline.
//!
//! This crate provides:
//! - Generation/entry cache store with SQLite backend
//! - Request and response types shared by the worker and hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CachedEntry, Generation};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, RequestMode, Response, ResponseKind};
