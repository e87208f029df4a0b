//! Core types and shared functionality for rutas.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Transit datasets, route search and client session state

pub mod cache;
pub mod config;
pub mod error;
pub mod transit;

pub use cache::{CacheDb, RequestIdentity, ResponseSnapshot, StorePolicy};
pub use config::AppConfig;
pub use error::Error;
