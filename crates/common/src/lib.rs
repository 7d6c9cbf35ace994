//! Myopoint Common Utilities
//!
//! Shared infrastructure for all Myopoint crates:
//! - Error types and result aliases
//! - Sample-timeline helpers and the update rate limiter
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
