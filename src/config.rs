//! TOML configuration file support.
//!
//! Every key is optional; anything left out keeps its default. Command-line
//! flags are applied on top of the loaded file.
//!
//! ```toml
//! # dimspec.toml
//! [server]
//! host = "0.0.0.0"
//! port = 8501
//!
//! [database]
//! data_dir = "/srv/dimspec/data"
//! candidates = ["dimspec_nist_pfas.sqlite", "dimspec_sample.sqlite"]
//!
//! [explorer]
//! page_sizes = [50, 100, 500, 1000]
//! export_row_limit = 100000
//! peak_list_limit = 200
//!
//! [spectra]
//! table = "ms_data"
//! peak_column = "peak_id"
//! mz_column = "measured_mz"
//! intensity_column = "measured_intensity"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::spectrum::SpectrumSource;

/// Root configuration structure for dimspec.toml files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where to look for the database file.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Table explorer and download limits.
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Location of the packed spectrum arrays.
    #[serde(default)]
    pub spectra: SpectrumSource,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Database file discovery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding the candidate files.
    pub data_dir: PathBuf,
    /// File names tried in order; the first that opens is used.
    pub candidates: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            candidates: vec![
                "dimspec_nist_pfas.sqlite".to_string(),
                "dimspec_sample.sqlite".to_string(),
            ],
        }
    }
}

/// Table explorer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Page sizes offered in the explorer; the first is the default.
    pub page_sizes: Vec<u64>,
    /// Maximum rows written to a single download.
    pub export_row_limit: u64,
    /// Maximum peak ids listed in the spectrum viewer.
    pub peak_list_limit: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            page_sizes: vec![50, 100, 500, 1000],
            export_row_limit: 100_000,
            peak_list_limit: 200,
        }
    }
}

impl ExplorerConfig {
    /// Page size used when the request names none.
    pub fn default_page_size(&self) -> u64 {
        self.page_sizes.first().copied().unwrap_or(50)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the explorer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.database.candidates.is_empty() {
            bail!("database.candidates must name at least one file");
        }
        if self.explorer.page_sizes.is_empty() || self.explorer.page_sizes.contains(&0) {
            bail!("explorer.page_sizes must be a non-empty list of positive sizes");
        }
        if self.explorer.export_row_limit == 0 {
            bail!("explorer.export_row_limit must be positive");
        }
        Ok(())
    }

    /// Candidate database paths, in the order they are tried.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        self.database
            .candidates
            .iter()
            .map(|name| self.database.data_dir.join(name))
            .collect()
    }
}
