//! NCBI commands: `download-top-taxa`, `download-genome`

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::ncbi::{DownloadOutcome, EutilsClient, GenomeDownloader};
use crate::taxonomy;
use crate::top_n::{self, ALL_PARTITION};
use std::path::Path;
use tracing::{info, warn};

fn downloader(config: &PipelineConfig, output_dir: &Path) -> Result<GenomeDownloader> {
    std::fs::create_dir_all(output_dir)?;
    let eutils = EutilsClient::new(config.ncbi.clone())?;
    Ok(GenomeDownloader::new(eutils, output_dir))
}

/// Species to download: the top species file, or the top N of a raw profile
fn species_queries(top_species: Option<&Path>, abundance: Option<&Path>, top_n: usize) -> Result<Vec<String>> {
    if let Some(path) = top_species {
        return top_n::read_species_names(path);
    }
    let Some(path) = abundance else {
        return Err(PipelineError::config("either a top species file or an abundance file is required"));
    };

    let table = taxonomy::try_extract_species_abundance(path, None)?;
    let partitions = top_n::select_top_species(&table, None, top_n);
    let species: Vec<String> = partitions
        .get(ALL_PARTITION)
        .map(|rows| rows.iter().map(|row| row.species.clone()).collect())
        .unwrap_or_default();
    if species.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no species-level abundance in '{}'",
            path.display()
        )));
    }
    Ok(species)
}

/// Download assemblies for every top species
pub async fn download_top_taxa(
    config: &PipelineConfig,
    top_species: Option<&Path>,
    abundance: Option<&Path>,
    output_dir: &Path,
    top_n: usize,
) -> Result<()> {
    let queries = species_queries(top_species, abundance, top_n)?;
    info!("Downloading assemblies for {} species into {}", queries.len(), output_dir.display());

    let outcomes = downloader(config, output_dir)?.download_all(&queries).await;
    let missing: Vec<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| {
            !matches!(
                outcome,
                Some(DownloadOutcome::Downloaded { .. } | DownloadOutcome::AlreadyPresent(_))
            )
        })
        .map(|(query, _)| query.as_str())
        .collect();
    if !missing.is_empty() {
        warn!("No assembly downloaded for {} species: {}", missing.len(), missing.join(", "));
    }
    Ok(())
}

/// Download the assembly of one species
pub async fn download_genome(config: &PipelineConfig, species: &str, output_dir: &Path) -> Result<()> {
    match downloader(config, output_dir)?.download_genome(species).await? {
        DownloadOutcome::AlreadyPresent(_) => Ok(()),
        DownloadOutcome::NoMatch => Err(PipelineError::NoTaxonomyMatch(species.to_string())),
        DownloadOutcome::NoAssemblyPath { accession } => Err(PipelineError::NoAssemblyPath(accession)),
        DownloadOutcome::NoFiles { url } => Err(PipelineError::NoData(format!(
            "no genomic or protein archives listed at {url}"
        ))),
        DownloadOutcome::AllFailed { failed } => Err(PipelineError::NoData(format!(
            "all {failed} assembly archive(s) for '{species}' failed to download"
        ))),
        DownloadOutcome::Downloaded {
            dir,
            downloaded,
            failed,
        } => {
            info!(downloaded, failed, "Assembly files saved to {}", dir.display());
            Ok(())
        },
    }
}
