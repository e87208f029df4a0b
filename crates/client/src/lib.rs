//! Client side of rutas.
//!
//! This crate provides the HTTP fetch pipeline, the cache lifecycle
//! controller, and dataset loading shared by the proxy server and CLI.

pub mod datasets;
pub mod fetch;
pub mod worker;

#[cfg(test)]
mod stub;

pub use datasets::load_datasets;
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use worker::{AssetManifest, CacheController, ControllerOptions, FetchOutcome, Source, WorkerState, WorkerStatus};
