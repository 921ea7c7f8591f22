//! qrep library
//!
//! Snapshots of a database's statement mix, drift detection between two
//! snapshots, and ranking of the queries shared by many shards.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use models::{DiffResult, IntersectionEntry, QueryRecord, RawStatement, Report};
pub use services::{
    CaptureService, DiffEngine, FilterPolicy, IntersectionEngine, MySQLClient, SweepService,
};
pub use utils::{QrepError, QrepResult};
