//! `glypho extract-top-species` command implementation

use crate::error::Result;
use crate::top_n;
use std::path::Path;
use tracing::info;

/// Species-level extraction followed by top-N selection per status
pub fn run(
    input: &Path,
    species_output: Option<&Path>,
    metadata: Option<&Path>,
    prefix: &Path,
    top_n: usize,
) -> Result<()> {
    let partitions = top_n::extract_top_species(input, species_output, metadata, prefix, top_n)?;
    info!(
        partitions = partitions.len(),
        "Wrote top species for {}",
        partitions.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}
