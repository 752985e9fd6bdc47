//! Captioneer Common Utilities
//!
//! Shared infrastructure for all Captioneer crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Standard file locations (config, font cache)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
