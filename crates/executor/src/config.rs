//! Mapper configuration via `procmap.toml`
//!
//! Every field has a default, so an empty file or a missing file yields the
//! default configuration.

use procmap_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "procmap.toml";

/// Mapper configuration loaded from `procmap.toml`.
///
/// # Example
///
/// ```toml
/// parameter_prefix = "@"
/// include_return_value = true
/// implicit_cast = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Marker character the provider prefixes parameter names with.
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: char,
    /// Whether read calls keep the return-value slot by default.
    #[serde(default = "default_true")]
    pub include_return_value: bool,
    /// Whether read calls convert column values to property types by default.
    #[serde(default = "default_true")]
    pub implicit_cast: bool,
}

fn default_parameter_prefix() -> char {
    '@'
}

fn default_true() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            parameter_prefix: default_parameter_prefix(),
            include_return_value: true,
            implicit_cast: true,
        }
    }
}

impl MapperConfig {
    /// Check field values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the parameter prefix is not an
    /// ASCII punctuation character.
    pub fn validate(&self) -> Result<()> {
        if !self.parameter_prefix.is_ascii_punctuation() {
            return Err(Error::configuration(format!(
                "Invalid parameter_prefix '{}'. Expected an ASCII punctuation character such as '@' or ':'.",
                self.parameter_prefix
            )));
        }
        Ok(())
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the text does not parse or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MapperConfig = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read config from a file path, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            Error::configuration(format!("In config file '{}': {}", path.display(), e))
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::configuration(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# procmap configuration
#
# Marker character the database provider puts in front of parameter
# names (SQL Server style "@Id"). Stripped before matching bag keys
# and entity properties.
parameter_prefix = "@"

# Keep the procedure's return value in read calls (default: true).
# Non-query and scalar calls always keep it.
include_return_value = true

# Convert column values to the property's declared type when the kinds
# differ (default: true). When false, kinds must match exactly.
implicit_cast = true
"#
    }
}

/// Per-call overrides for the read entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Keep the return-value slot in the parameter set
    pub include_return_value: bool,
    /// Convert column values to property types
    pub implicit_cast: bool,
}

impl ReadOptions {
    /// Set `include_return_value`
    pub fn with_return_value(mut self, include: bool) -> Self {
        self.include_return_value = include;
        self
    }

    /// Set `implicit_cast`
    pub fn with_implicit_cast(mut self, implicit_cast: bool) -> Self {
        self.implicit_cast = implicit_cast;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions::from(&MapperConfig::default())
    }
}

impl From<&MapperConfig> for ReadOptions {
    fn from(config: &MapperConfig) -> Self {
        ReadOptions {
            include_return_value: config.include_return_value,
            implicit_cast: config.implicit_cast,
        }
    }
}
