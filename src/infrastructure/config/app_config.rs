//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::infrastructure::catalog::DEFAULT_SEARCH_URL;
use crate::infrastructure::image::PipelineConfig;

const APP_NAME: &str = "refract";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from file and CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Catalog search configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Catalog search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Search endpoint.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Search term.
    #[serde(default = "default_term")]
    pub term: String,

    /// Maximum number of results requested.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_term() -> String {
    "the rolling stones".to_string()
}

fn default_limit() -> u32 {
    50
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            term: default_term(),
            limit: default_limit(),
        }
    }
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(term) = args.term {
            self.catalog.term = term;
        }
        if let Some(limit) = args.limit {
            self.catalog.limit = limit;
        }
        if let Some(max_concurrent_fetches) = args.max_concurrent_fetches {
            self.pipeline.max_concurrent_fetches = max_concurrent_fetches;
        }
        if args.pipeline_debug {
            self.pipeline.debug.pipeline_debug = true;
        }
        if args.cache_debug {
            self.pipeline.debug.cache_debug = true;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("refract.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config_sections() {
        let toml_content = r#"
            log_level = "debug"

            [pipeline]
            pipeline_debug = true
            max_concurrent_fetches = 8
            user_agent = "refract-test"

            [catalog]
            term = "miles davis"
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.pipeline.debug.pipeline_debug);
        assert!(!config.pipeline.debug.cache_debug);
        assert_eq!(config.pipeline.max_concurrent_fetches, 8);
        assert_eq!(config.pipeline.user_agent.as_deref(), Some("refract-test"));
        assert_eq!(
            config.pipeline.memory_cache_bytes,
            PipelineConfig::default().memory_cache_bytes
        );
        assert_eq!(config.catalog.term, "miles davis");
        assert_eq!(config.catalog.limit, 50);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.catalog.search_url, DEFAULT_SEARCH_URL);
    }

    #[test]
    fn test_default_config_survives_toml_round_trip() {
        let rendered = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();

        assert_eq!(parsed.pipeline, PipelineConfig::default());
        assert_eq!(parsed.catalog, CatalogConfig::default());
    }

    #[test]
    fn test_cli_args_override_file_values() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "refract",
            "--log-level",
            "trace",
            "--term",
            "nina simone",
            "--limit",
            "10",
            "--cache-debug",
        ]);

        config.merge_with_args(args);

        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.catalog.term, "nina simone");
        assert_eq!(config.catalog.limit, 10);
        assert!(config.pipeline.debug.cache_debug);
        assert!(!config.pipeline.debug.pipeline_debug);
    }
}
