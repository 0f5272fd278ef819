//! NCBI genome assembly retrieval

pub mod download;
pub mod eutils;

pub use download::{DownloadOutcome, GenomeDownloader, ResolvedSpecies};
pub use eutils::{AssemblySummary, EutilsClient};
