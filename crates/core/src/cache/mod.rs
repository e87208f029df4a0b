//! SQLite-backed versioned cache for static assets.
//!
//! This module provides the persistent store behind the cache controller,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations, one per deployed version
//! - Entries addressed by request identity (method + canonical URL)
//! - All-or-nothing generation installs
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - A small key-value table for client preferences

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod kv;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{ResponseSnapshot, StorePolicy};
pub use generations::GenerationInfo;
pub use hash::RequestIdentity;
