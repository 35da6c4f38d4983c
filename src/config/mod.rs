//! Configuration module for the search-and-crawl service
//!
//! This module provides the `ServiceConfig` struct, its builder, and the
//! environment loader, with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod env;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::ServiceConfigBuilder;
pub use types::{ConfigError, ConfigSummary, ServiceConfig};
