//! Enzyme hit collection and UniRef90 enrichment
//!
//! `combine_outputs` walks species × enzyme sequentially. Enrichment fans
//! the (species, UniRef90 cluster) cross-product out through a bounded pool
//! so homologues annotated under a cluster, but not under the EC query, are
//! picked up for species still missing part of the pathway.

use crate::error::{PipelineError, Result};
use crate::top_n;
use crate::uniprot::{self, QueryFilter, UniProtClient, UniProtHit};
use futures::stream::{self, StreamExt};
use glypho_common::Enzyme;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Query every enzyme for every species and tag the hits.
///
/// Queries run one at a time; a failed query contributes nothing.
pub async fn combine_outputs(
    client: &UniProtClient,
    species: &[String],
    enzymes: &[Enzyme],
) -> Vec<UniProtHit> {
    let mut all = Vec::new();

    for name in species {
        for enzyme in enzymes {
            info!(
                "Searching UniProt for species: {}, enzyme: {}, EC: {}",
                name, enzyme.name, enzyme.ec
            );
            let hits = client.search(name, &QueryFilter::Ec(enzyme.ec.to_string())).await;
            all.extend(hits.into_iter().map(|mut hit| {
                hit.species = Some(name.clone());
                hit.enzyme = Some(enzyme.name.to_string());
                hit
            }));
        }
    }

    info!("Collected {} UniProt hits for {} species", all.len(), species.len());
    all
}

/// Unique values in first-seen order
fn unique_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Species of `hits` whose detected ECs already cover `targets`
pub fn complete_species(hits: &[UniProtHit], targets: &BTreeSet<String>) -> HashSet<String> {
    let mut detected: HashMap<&str, HashSet<&str>> = HashMap::new();
    for hit in hits {
        if let Some(species) = hit.species.as_deref() {
            detected.entry(species).or_default().extend(hit.ec_numbers());
        }
    }

    detected
        .into_iter()
        .filter(|(_, ecs)| targets.iter().all(|t| ecs.contains(t.as_str())))
        .map(|(species, _)| species.to_string())
        .collect()
}

/// The (species, cluster) queries enrichment would issue for `hits`.
///
/// Species come in first-seen order and skip those already complete;
/// clusters are the unique non-empty UniRef90 ids. No pair repeats.
pub fn enrichment_tasks(hits: &[UniProtHit], targets: &BTreeSet<String>) -> Vec<(String, String)> {
    let complete = complete_species(hits, targets);
    let species: Vec<String> = unique_in_order(hits.iter().filter_map(|h| h.species.as_deref()))
        .into_iter()
        .filter(|s| !complete.contains(s))
        .collect();
    let clusters = unique_in_order(hits.iter().filter_map(UniProtHit::uniref90_id));

    species
        .iter()
        .flat_map(|s| clusters.iter().map(move |c| (s.clone(), c.clone())))
        .collect()
}

/// Search each incomplete species within each UniRef90 cluster of `hits`.
///
/// At most `max_workers` queries are in flight. Results are concatenated in
/// completion order.
pub async fn enrich_with_uniref(
    client: &UniProtClient,
    hits: &[UniProtHit],
    targets: &BTreeSet<String>,
    max_workers: usize,
) -> Vec<UniProtHit> {
    let tasks = enrichment_tasks(hits, targets);
    let total = tasks.len();
    info!(
        "Dispatching {} UniRef90 queries (max_workers={})",
        total,
        max_workers
    );

    let results: Vec<Vec<UniProtHit>> = stream::iter(tasks)
        .map(|(species, cluster)| async move {
            info!("Searching UniProt for species: {}, uniref90: {}", species, cluster);
            let hits = client.search(&species, &QueryFilter::UniRef90(cluster)).await;
            hits.into_iter()
                .map(|mut hit| {
                    hit.species = Some(species.clone());
                    hit
                })
                .collect::<Vec<_>>()
        })
        .buffer_unordered(max_workers.max(1))
        .collect()
        .await;

    let enriched: Vec<UniProtHit> = results.into_iter().flatten().collect();
    info!("UniRef90 enrichment complete: {} hits from {} queries", enriched.len(), total);
    enriched
}

/// Fill missing UniRef90 ids by looking up each unique accession.
///
/// Lookups share the same bounded pool as enrichment; an accession whose
/// lookup fails keeps an empty id.
pub async fn resolve_uniref90(
    client: &UniProtClient,
    hits: &mut [UniProtHit],
    max_workers: usize,
) {
    let accessions = unique_in_order(
        hits.iter()
            .filter(|h| h.uniref90_id().is_none())
            .map(|h| h.accession.as_str()),
    );
    if accessions.is_empty() {
        return;
    }
    info!("Resolving UniRef90 clusters for {} accessions", accessions.len());

    let resolved: HashMap<String, String> = stream::iter(accessions)
        .map(|accession| async move {
            let cluster = client.uniref90_for_accession(&accession).await;
            cluster.map(|c| (accession, c))
        })
        .buffer_unordered(max_workers.max(1))
        .filter_map(|pair| async move { pair })
        .collect()
        .await;

    for hit in hits.iter_mut().filter(|h| h.uniref90_id().is_none()) {
        if let Some(cluster) = resolved.get(&hit.accession) {
            hit.uniref90 = Some(cluster.clone());
        }
    }
    info!("Resolved {} UniRef90 clusters", resolved.len());
}

/// Load an existing hits table, or build one from a top-species file.
///
/// Generated hits are written to `combined_output` when given.
pub async fn load_or_generate(
    client: &UniProtClient,
    result_file: Option<&Path>,
    top_species_file: Option<&Path>,
    enzymes: &[Enzyme],
    combined_output: Option<&Path>,
) -> Result<Vec<UniProtHit>> {
    if let Some(path) = result_file {
        info!("Loading existing result file: {}", path.display());
        return uniprot::read_hits(path);
    }

    let Some(top_species_file) = top_species_file else {
        return Err(PipelineError::config(
            "either a UniProt result file or a top species file is required",
        ));
    };

    info!("No result file provided. Generating result file...");
    let species = top_n::read_species_names(top_species_file)?;
    let hits = combine_outputs(client, &species, enzymes).await;

    if let Some(path) = combined_output {
        uniprot::write_hits(path, &hits)?;
        info!("Concatenated UniProt search results have been saved to '{}'.", path.display());
    }
    Ok(hits)
}

/// Options for [`add_ec_from_uniref`]
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub max_workers: usize,
    pub resolve_uniref90: bool,
}

/// Enrich `hits` through their UniRef90 clusters and write the new hits.
///
/// Hits without any cluster id (after optional resolution) produce a
/// header-only output.
pub async fn add_ec_from_uniref(
    client: &UniProtClient,
    mut hits: Vec<UniProtHit>,
    targets: &BTreeSet<String>,
    output: &Path,
    options: &EnrichOptions,
) -> Result<Vec<UniProtHit>> {
    if options.resolve_uniref90 {
        resolve_uniref90(client, &mut hits, options.max_workers).await;
    }

    let enriched = if hits.iter().any(|h| h.uniref90_id().is_some()) {
        enrich_with_uniref(client, &hits, targets, options.max_workers).await
    } else {
        warn!("No UniRef90 cluster ids in the input hits; nothing to enrich");
        Vec::new()
    };

    uniprot::write_hits(output, &enriched)?;
    info!("Concatenated UniProt search results have been saved to '{}'.", output.display());
    Ok(enriched)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use glypho_common::types::shikimate_ecs;

    fn hit(species: &str, ec: &str, cluster: &str) -> UniProtHit {
        UniProtHit {
            accession: format!("{species}-{ec}"),
            ec: ec.to_string(),
            uniref90: Some(cluster.to_string()),
            species: Some(species.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_species_detected() {
        let targets = shikimate_ecs();
        let mut hits: Vec<UniProtHit> = targets.iter().map(|ec| hit("Full", ec, "U1")).collect();
        hits.push(hit("Partial", "2.5.1.19", "U2"));

        let complete = complete_species(&hits, &targets);
        assert!(complete.contains("Full"));
        assert!(!complete.contains("Partial"));
    }

    #[test]
    fn test_complete_species_splits_multi_ec_cells() {
        let targets: BTreeSet<String> = ["2.7.1.71", "4.2.3.4"].iter().map(|s| s.to_string()).collect();
        let hits = vec![hit("Multi", "2.7.1.71; 4.2.3.4", "")];
        assert!(complete_species(&hits, &targets).contains("Multi"));
    }

    #[test]
    fn test_tasks_skip_complete_and_never_repeat() {
        let targets = shikimate_ecs();
        let mut hits: Vec<UniProtHit> = targets.iter().map(|ec| hit("Full", ec, "U1")).collect();
        hits.push(hit("B", "2.5.1.19", "U2"));
        hits.push(hit("A", "4.2.3.5", "U1"));
        hits.push(hit("B", "4.2.3.5", "U2"));
        hits.push(hit("A", "1.1.1.25", ""));

        let tasks = enrichment_tasks(&hits, &targets);
        assert_eq!(
            tasks,
            vec![
                ("B".to_string(), "U1".to_string()),
                ("B".to_string(), "U2".to_string()),
                ("A".to_string(), "U1".to_string()),
                ("A".to_string(), "U2".to_string()),
            ]
        );

        let unique: HashSet<_> = tasks.iter().collect();
        assert_eq!(unique.len(), tasks.len());
    }

    #[test]
    fn test_tasks_empty_without_clusters() {
        let targets = shikimate_ecs();
        let hits = vec![hit("A", "2.5.1.19", ""), hit("B", "4.2.3.5", "  ")];
        assert!(enrichment_tasks(&hits, &targets).is_empty());
    }
}
