//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache stores with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedResponse, RequestKey, StoreSummary};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
