//! Core library modules for butterfly-network
//!
//! Error taxonomy and builder configuration shared by every other module.

pub mod config;
pub mod error;

// Re-export main types for internal use
pub use config::BuilderConfig;
pub use error::{Error, Result};
