//! Application configuration.

/// Application configuration types.
pub mod app_config;
/// Command-line arguments.
pub mod args;
/// Configuration file loading.
pub mod storage;

pub use app_config::{AppConfig, CatalogConfig, LogLevel};
pub use args::CliArgs;
pub use storage::{ConfigError, ConfigStore};
