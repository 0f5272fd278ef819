//! Pipeline configuration
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, and `GLYPHO_*` / `NCBI_*` environment variables.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// UniProt REST API root.
pub const DEFAULT_UNIPROT_URL: &str = "https://rest.uniprot.org";

/// Rows requested per UniProt search page.
pub const DEFAULT_UNIPROT_PAGE_SIZE: usize = 500;

/// Maximum pages followed per UniProt query.
pub const DEFAULT_UNIPROT_MAX_PAGES: usize = 20;

/// NCBI E-utilities root.
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Pause after every taxonomy/assembly lookup (NCBI allows ~3 req/s without a key).
pub const DEFAULT_NCBI_DELAY_MS: u64 = 500;

/// Tool name reported to NCBI.
pub const DEFAULT_NCBI_TOOL: &str = "glypho";

/// HTTP timeout applied to every request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Concurrent UniProt queries during enrichment.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Gene predictor executable.
pub const DEFAULT_PRODIGAL_BIN: &str = "prodigal";

/// Prodigal procedure (`-p`).
pub const DEFAULT_PRODIGAL_MODE: &str = "meta";

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub uniprot: UniProtConfig,
    pub ncbi: NcbiConfig,
    pub prodigal: ProdigalConfig,
}

/// UniProt REST settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniProtConfig {
    pub base_url: String,
    pub page_size: usize,
    pub max_pages: usize,
    pub timeout_secs: u64,
    pub max_workers: usize,
}

impl Default for UniProtConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UNIPROT_URL.to_string(),
            page_size: DEFAULT_UNIPROT_PAGE_SIZE,
            max_pages: DEFAULT_UNIPROT_MAX_PAGES,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl UniProtConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// NCBI E-utilities settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NcbiConfig {
    pub eutils_url: String,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub tool: String,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            eutils_url: DEFAULT_EUTILS_URL.to_string(),
            request_delay_ms: DEFAULT_NCBI_DELAY_MS,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            api_key: None,
            email: None,
            tool: DEFAULT_NCBI_TOOL.to_string(),
        }
    }
}

impl NcbiConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External gene predictor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProdigalConfig {
    pub binary: String,
    pub mode: String,
}

impl Default for ProdigalConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_PRODIGAL_BIN.to_string(),
            mode: DEFAULT_PRODIGAL_MODE.to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl PipelineConfig {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply environment variable overrides
    pub fn merge_env(mut self) -> Self {
        if let Ok(url) = std::env::var("GLYPHO_UNIPROT_URL") {
            self.uniprot.base_url = url;
        }
        if let Some(size) = env_parse("GLYPHO_UNIPROT_PAGE_SIZE") {
            self.uniprot.page_size = size;
        }
        if let Some(pages) = env_parse("GLYPHO_UNIPROT_MAX_PAGES") {
            self.uniprot.max_pages = pages;
        }
        if let Ok(url) = std::env::var("GLYPHO_EUTILS_URL") {
            self.ncbi.eutils_url = url;
        }
        if let Some(delay) = env_parse("GLYPHO_NCBI_DELAY_MS") {
            self.ncbi.request_delay_ms = delay;
        }
        if let Ok(key) = std::env::var("NCBI_API_KEY") {
            self.ncbi.api_key = Some(key);
        }
        if let Ok(email) = std::env::var("NCBI_EMAIL") {
            self.ncbi.email = Some(email);
        }
        if let Some(timeout) = env_parse::<u64>("GLYPHO_HTTP_TIMEOUT_SECS") {
            self.uniprot.timeout_secs = timeout;
            self.ncbi.timeout_secs = timeout;
        }
        if let Ok(bin) = std::env::var("GLYPHO_PRODIGAL_BIN") {
            self.prodigal.binary = bin;
        }
        if let Ok(mode) = std::env::var("GLYPHO_PRODIGAL_MODE") {
            self.prodigal.mode = mode;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.uniprot.base_url.is_empty() {
            return Err(PipelineError::config("UniProt base URL cannot be empty"));
        }
        if self.uniprot.page_size == 0 || self.uniprot.page_size > 500 {
            return Err(PipelineError::config(format!(
                "UniProt page size must be between 1 and 500, got {}",
                self.uniprot.page_size
            )));
        }
        if self.uniprot.max_pages == 0 {
            return Err(PipelineError::config("UniProt max_pages must be greater than 0"));
        }
        if self.uniprot.max_workers == 0 {
            return Err(PipelineError::config("max_workers must be greater than 0"));
        }
        if self.ncbi.eutils_url.is_empty() {
            return Err(PipelineError::config("E-utilities URL cannot be empty"));
        }
        if self.uniprot.timeout_secs == 0 || self.ncbi.timeout_secs == 0 {
            return Err(PipelineError::config("HTTP timeout must be greater than 0"));
        }
        if self.prodigal.binary.is_empty() {
            return Err(PipelineError::config("Prodigal binary cannot be empty"));
        }
        Ok(())
    }
}
