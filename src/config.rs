//! taskdump.toml configuration
//!
//! # Example taskdump.toml
//!
//! ```toml
//! [loader]
//! header_prefix = "goroutine "
//!
//! [display]
//! color = true
//! search_limit = 10
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::record::DEFAULT_HEADER_PREFIX;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TaskdumpConfig {
    pub loader: LoaderConfig,
    pub display: DisplayConfig,
}

/// How raw dumps are split into tasks
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Prefix that starts a metadata line
    pub header_prefix: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            header_prefix: DEFAULT_HEADER_PREFIX.to_string(),
        }
    }
}

/// Terminal output settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Color show/search output
    pub color: bool,
    /// Default limit for search(); show() without arguments prints every task
    pub search_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            search_limit: 10,
        }
    }
}

impl TaskdumpConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        if config.loader.header_prefix.trim().is_empty() {
            anyhow::bail!("loader.header_prefix must not be empty");
        }
        Ok(config)
    }
}
