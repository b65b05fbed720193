//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, stage catalog)
//! - `metrics` - Lock-free request metrics

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::{BranchConfig, Config};
pub use metrics::Metrics;
