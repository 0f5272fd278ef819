//! Glypho Common Library
//!
//! Shared types, logging and file utilities for the glypho workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`GlyphoError`] and the crate [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Compression**: gzip helpers used around genome and protein files
//! - **Types**: taxonomic ranks, lineages and the shikimate enzyme registry
//!
//! # Example
//!
//! ```no_run
//! use glypho_common::compression::gunzip_file;
//! use glypho_common::Result;
//!
//! fn unpack(path: &str) -> Result<()> {
//!     gunzip_file(path, "genome.fna")?;
//!     Ok(())
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod compression;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{GlyphoError, Result};
pub use types::{Enzyme, Lineage, TaxonomicRank, SHIKIMATE_ENZYMES};
