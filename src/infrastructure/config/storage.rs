//! Configuration file loading and persistence.
//!
//! Each top-level section is read on its own. A section that fails to
//! deserialize or holds unusable values is replaced by its defaults and
//! reported; the rest of the file still applies.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use super::app_config::{AppConfig, CatalogConfig, LogLevel};
use crate::infrastructure::image::PipelineConfig;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory and no explicit path.
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    /// The file could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Defaults could not be rendered as TOML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    /// A section parsed but holds a value the application cannot use.
    #[error("[{section}] {field}: {reason}")]
    Invalid {
        /// Section name.
        section: &'static str,
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ConfigError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    const fn invalid(section: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::Invalid {
            section,
            field,
            reason,
        }
    }
}

/// A section of the config file that can check its own values.
trait Section: DeserializeOwned + Default {
    const NAME: &'static str;

    fn check(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

fn positive<T: Default + PartialEq>(
    section: &'static str,
    field: &'static str,
    value: T,
) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(ConfigError::invalid(section, field, "must be at least 1"));
    }
    Ok(())
}

impl Section for LogLevel {
    const NAME: &'static str = "log_level";
}

impl Section for PipelineConfig {
    const NAME: &'static str = "pipeline";

    fn check(&self) -> Result<(), ConfigError> {
        positive(Self::NAME, "memory_cache_bytes", self.memory_cache_bytes)?;
        positive(Self::NAME, "memory_cache_entries", self.memory_cache_entries)?;
        positive(Self::NAME, "max_concurrent_fetches", self.max_concurrent_fetches)?;
        positive(Self::NAME, "timeout_secs", self.timeout_secs)
    }
}

impl Section for CatalogConfig {
    const NAME: &'static str = "catalog";

    fn check(&self) -> Result<(), ConfigError> {
        if self.search_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                Self::NAME,
                "search_url",
                "must not be empty",
            ));
        }
        positive(Self::NAME, "limit", self.limit)
    }
}

/// Reads and writes the TOML configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Uses `path_override` if given, else `config.toml` in the platform
    /// config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if no path is given and the
    /// platform has no config directory.
    pub fn locate(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path_override {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_config_path().ok_or(ConfigError::NoConfigDir)?,
        };
        Ok(Self { path })
    }

    /// Uses the file at `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the configuration.
    ///
    /// A missing file is written with defaults. An unparsable file, or an
    /// unusable section, falls back to defaults and the file is left as is.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read, or
    /// defaults cannot be written.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = AppConfig::default();
                self.save(&config)?;
                info!(path = %self.path.display(), "Wrote default configuration");
                return Ok(config);
            }
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        let mut table = match toml::from_str::<toml::Table>(&content) {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Config file is not valid TOML, using defaults"
                );
                return Ok(AppConfig::default());
            }
        };

        let config = AppConfig {
            log_level: self.section(&mut table),
            pipeline: self.section(&mut table),
            catalog: self.section(&mut table),
            ..AppConfig::default()
        };

        if !table.is_empty() {
            let keys: Vec<&str> = table.keys().map(String::as_str).collect();
            warn!(
                path = %self.path.display(),
                keys = ?keys,
                "Ignoring unknown config keys"
            );
        }

        Ok(config)
    }

    /// Writes `config` atomically, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if rendering or any filesystem step fails.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(config)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;

        let mut staged =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
        staged
            .write_all(rendered.as_bytes())
            .map_err(|e| ConfigError::io(staged.path(), e))?;
        staged
            .persist(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e.error))?;
        Ok(())
    }

    fn section<T: Section>(&self, table: &mut toml::Table) -> T {
        let Some(value) = table.remove(T::NAME) else {
            return T::default();
        };

        let section = match value.try_into::<T>() {
            Ok(section) => section,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    section = T::NAME,
                    error = %e,
                    "Malformed config section, using defaults"
                );
                return T::default();
            }
        };

        if let Err(e) = section.check() {
            warn!(
                path = %self.path.display(),
                section = T::NAME,
                error = %e,
                "Unusable config section, using defaults"
            );
            return T::default();
        }
        section
    }
}
