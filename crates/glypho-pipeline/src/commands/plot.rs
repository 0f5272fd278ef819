//! `glypho plot` command implementations

use crate::error::Result;
use crate::plot;
use crate::summary;
use crate::taxonomy::{AbundanceTable, SPECIES_COLUMN};
use crate::top_n;
use crate::tsv::{self, Table};
use glypho_common::TaxonomicRank;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Stacked composition bars, one per group
pub fn composition(
    groups: &[(String, PathBuf)],
    species_table: &Path,
    rank: TaxonomicRank,
    top_n: usize,
    output: &Path,
) -> Result<()> {
    let table = AbundanceTable::read(species_table)?;
    let groups = groups
        .iter()
        .map(|(label, path)| Ok((label.clone(), top_n::read_top_species(path)?)))
        .collect::<Result<Vec<_>>>()?;

    let matrix = plot::composition_matrix(&groups, &table, rank, top_n);
    plot::plot_composition(&matrix, output)?;
    info!("Composition plot at {} level saved to {}", rank, output.display());
    Ok(())
}

/// Complete vs incomplete species per taxon
pub fn taxa_completion(input: &Path, output: &Path) -> Result<()> {
    let rows = summary::read_taxa_completion(input)?;
    plot::plot_taxa_completion(&rows, output)?;
    info!("Taxa completion plot saved to {}", output.display());
    Ok(())
}

fn species_set(path: &Path) -> Result<BTreeSet<String>> {
    let table = Table::read(path)?;
    Ok(table
        .column(SPECIES_COLUMN)?
        .into_iter()
        .filter(|cell| !tsv::is_missing(cell))
        .map(str::to_string)
        .collect())
}

/// Venn diagram of the species of two tables
pub fn venn(left: &Path, right: &Path, labels: (&str, &str), output: &Path) -> Result<()> {
    let counts = plot::plot_venn(labels, &species_set(left)?, &species_set(right)?, output)?;
    info!(
        only_left = counts.only_left,
        both = counts.both,
        only_right = counts.only_right,
        "Venn diagram saved to {}",
        output.display()
    );
    Ok(())
}
