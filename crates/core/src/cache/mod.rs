//! SQLite-backed versioned cache stores.
//!
//! This module provides named cache stores keyed by request identity,
//! persisted in SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Open-by-name, list-all-names and delete-by-name on stores
//! - Match, put and atomic bulk insert on entries
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, RequestKey};
pub use stores::StoreSummary;
