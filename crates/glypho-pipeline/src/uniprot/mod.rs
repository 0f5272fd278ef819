//! UniProt search for pathway enzymes
//!
//! Queries combine an organism with either an EC number or a UniRef90
//! cluster. Hit tables are TSV with the UniProt columns followed by the
//! pipeline's `UniRef90`, `Species` and `Enzyme` tags.

pub mod client;
pub mod types;

pub use client::UniProtClient;
pub use types::{build_query, QueryFilter, UniProtHit, HIT_HEADER};

use crate::error::Result;
use crate::tsv;
use std::path::Path;

pub fn write_hits(path: &Path, hits: &[UniProtHit]) -> Result<()> {
    tsv::write_records(path, &HIT_HEADER, hits)
}

pub fn read_hits(path: &Path) -> Result<Vec<UniProtHit>> {
    tsv::read_records(path)
}

/// Hits as TSV on stdout
pub fn print_hits(hits: &[UniProtHit]) -> Result<()> {
    tsv::write_records_to(std::io::stdout().lock(), &HIT_HEADER, hits)
}
