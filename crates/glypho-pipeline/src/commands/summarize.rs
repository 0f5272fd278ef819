//! `glypho summarize` command implementation

use crate::error::{PipelineError, Result};
use crate::summary;
use crate::taxonomy::AbundanceTable;
use crate::uniprot;
use glypho_common::types::shikimate_ecs;
use glypho_common::TaxonomicRank;
use std::path::Path;
use tracing::info;

/// Where EC detections come from
#[derive(Debug, Clone, Copy)]
pub enum DetectionSource<'a> {
    /// UniProt hits tagged with Species
    Hits(&'a Path),
    /// Per-species DeepEC result folders
    DeepEc { root: &'a Path, file_name: &'a str },
}

/// Per-taxon counts written next to the species summary
#[derive(Debug, Clone, Copy)]
pub struct TaxaOutput<'a> {
    pub species_table: &'a Path,
    pub output: &'a Path,
    pub rank: TaxonomicRank,
    pub threshold: f64,
}

/// Completeness per species, and optionally per taxon
pub fn run(
    source: DetectionSource<'_>,
    status: &str,
    output: &Path,
    taxa: Option<TaxaOutput<'_>>,
) -> Result<()> {
    let detections = match source {
        DetectionSource::Hits(path) => summary::detections_from_hits(&uniprot::read_hits(path)?),
        DetectionSource::DeepEc { root, file_name } => summary::load_deepec_results(root, file_name)?,
    };
    if detections.is_empty() {
        return Err(PipelineError::NoData("no EC detections to summarize".to_string()));
    }

    let rows = summary::summarize_ec_completeness(&detections, &shikimate_ecs(), status);
    summary::write_summary(output, &rows)?;
    info!("Completeness for {} species saved to {}", rows.len(), output.display());

    if let Some(taxa) = taxa {
        let table = AbundanceTable::read(taxa.species_table)?;
        let counts = summary::taxa_completion_from_table(&rows, &table, taxa.rank, taxa.threshold);
        summary::write_taxa_completion(taxa.output, &counts)?;
        info!(
            "Complete/incomplete counts for {} {} taxa saved to {}",
            counts.len(),
            taxa.rank,
            taxa.output.display()
        );
    }
    Ok(())
}
