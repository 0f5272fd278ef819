//! Error types for the glypho pipeline
//!
//! Messages are user-facing: each names what failed and, where there is
//! one, the input the user should check.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required input file is missing
    #[error("File not found: '{}'. Verify the path exists and is readable.", .0.display())]
    FileNotFound(PathBuf),

    /// Table is missing a required column
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// Table content could not be interpreted
    #[error("Invalid table {table}: {reason}")]
    InvalidTable { table: String, reason: String },

    /// Nothing left to work on after filtering
    #[error("No data: {0}")]
    NoData(String),

    /// Remote service answered with a non-success status
    #[error("{service} request failed with status {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Taxonomy search found no usable organism
    #[error("No taxonomy match with an assembly for '{0}'")]
    NoTaxonomyMatch(String),

    /// Assembly record lacks a usable download location
    #[error("Assembly {0} has no RefSeq or GenBank FTP path")]
    NoAssemblyPath(String),

    /// External program failed
    #[error("External tool '{tool}' failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    /// Chart rendering failed
    #[error("Plot error: {0}")]
    Plot(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your config file and GLYPHO_* environment variables.")]
    Config(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Common(#[from] glypho_common::GlyphoError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn invalid_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn external_tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn plot(err: impl std::fmt::Display) -> Self {
        Self::Plot(err.to_string())
    }
}
