//! SqMGR sports ingestion and winning-square engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the sync binary.

pub mod config;
pub mod espn;
pub mod logging;
pub mod scoring;
pub mod store;
pub mod sync;
pub mod types;
