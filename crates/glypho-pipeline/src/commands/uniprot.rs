//! UniProt commands: `combine-outputs`, `add-ec-from-uniref`, `search-uniprot`

use crate::config::PipelineConfig;
use crate::enrich::{self, EnrichOptions};
use crate::error::Result;
use crate::top_n;
use crate::uniprot::{self, QueryFilter, UniProtClient};
use glypho_common::types::shikimate_ecs;
use glypho_common::SHIKIMATE_ENZYMES;
use std::path::Path;
use tracing::info;

/// Query every pathway enzyme for every top species and save the hits
pub async fn combine_outputs(config: &PipelineConfig, top_species: &Path, output: &Path) -> Result<()> {
    let species = top_n::read_species_names(top_species)?;
    let client = UniProtClient::new(config.uniprot.clone())?;

    let hits = enrich::combine_outputs(&client, &species, &SHIKIMATE_ENZYMES).await;
    uniprot::write_hits(output, &hits)?;
    info!("Concatenated UniProt search results have been saved to '{}'.", output.display());
    Ok(())
}

/// Enrich hits through their UniRef90 clusters
pub async fn add_ec_from_uniref(
    config: &PipelineConfig,
    result_file: Option<&Path>,
    top_species: Option<&Path>,
    output: &Path,
    combined_output: Option<&Path>,
    max_workers: Option<usize>,
    resolve_uniref90: bool,
) -> Result<()> {
    let client = UniProtClient::new(config.uniprot.clone())?;
    let hits =
        enrich::load_or_generate(&client, result_file, top_species, &SHIKIMATE_ENZYMES, combined_output)
            .await?;

    let options = EnrichOptions {
        max_workers: max_workers.unwrap_or(config.uniprot.max_workers).max(1),
        resolve_uniref90,
    };
    let enriched = enrich::add_ec_from_uniref(&client, hits, &shikimate_ecs(), output, &options).await?;
    info!(hits = enriched.len(), "UniRef90 enrichment finished");
    Ok(())
}

/// One organism, one EC number or UniRef90 cluster
pub async fn search(
    config: &PipelineConfig,
    organism: &str,
    filter: QueryFilter,
    output: Option<&Path>,
) -> Result<()> {
    let client = UniProtClient::new(config.uniprot.clone())?;
    let hits = client.try_search(organism, &filter).await?;
    info!("Found {} UniProt entries for {} ({})", hits.len(), organism, filter);

    match output {
        Some(path) => {
            uniprot::write_hits(path, &hits)?;
            info!("Saved UniProt hits to '{}'.", path.display());
        },
        None => uniprot::print_hits(&hits)?,
    }
    Ok(())
}
