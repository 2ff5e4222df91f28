// pcd-tools - maintenance tools for Profilarr custom format databases
//
// This is the library crate containing the validator, converter and pattern
// maintenance services. The binary crate (main.rs) provides the `pcd` CLI.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use models::{CustomFormat, QualityProfile, RepoLayout, ToolConfig};
pub use services::{Diagnostic, ValidationReport, Validator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
