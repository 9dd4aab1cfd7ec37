//! Optional TOML configuration (`ast-dump.toml`).
//!
//! ```toml
//! format = "json"
//! crate_name = "shapes"
//! jobs = 4
//!
//! [filter]
//! statements = false
//! ```
//!
//! Command-line flags take precedence over everything here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::ports::RecordFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    pub format: OutputFormat,
    pub crate_name: Option<String>,
    pub jobs: Option<usize>,
    pub filter: RecordFilter,
}

impl DumpConfig {
    pub const DEFAULT_FILE: &'static str = "ast-dump.toml";

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// An explicit path must exist; otherwise `ast-dump.toml` in the working
    /// directory is used when present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(Self::DEFAULT_FILE);
                if default.is_file() {
                    tracing::debug!("using {}", Self::DEFAULT_FILE);
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
