//! Top-N species selection
//!
//! Ranks species by mean abundance, either across every sample or per
//! `Status` group of a sample metadata table.

use crate::error::{PipelineError, Result};
use crate::taxonomy::{self, AbundanceTable};
use crate::tsv::{self, Table};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Partition name used when no metadata is given
pub const ALL_PARTITION: &str = "all";

pub const SAMPLE_NAME_COLUMN: &str = "sample_name";
pub const STATUS_COLUMN: &str = "Status";

pub const TOP_SPECIES_HEADER: [&str; 2] = ["Species", "Average_Abundance"];

/// One ranked species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSpecies {
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "Average_Abundance")]
    pub average_abundance: Option<f64>,
}

/// Sample ids grouped by status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMetadata {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl SampleMetadata {
    /// Read a metadata TSV; both `sample_name` and `Status` are required
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        let samples = table.column(SAMPLE_NAME_COLUMN)?;
        let statuses = table.column(STATUS_COLUMN)?;

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (sample, status) in samples.into_iter().zip(statuses) {
            if tsv::is_missing(status) {
                continue;
            }
            groups
                .entry(status.to_string())
                .or_default()
                .push(sample.to_string());
        }
        Ok(Self { groups })
    }
}

/// Sample id of an abundance column: the text before the first `_`
pub fn sample_prefix(column: &str) -> &str {
    column.split('_').next().unwrap_or(column)
}

/// Rank rows by mean over `columns`, descending, keeping ties in row order.
///
/// Rows without any value sort last.
pub fn rank_species(table: &AbundanceTable, columns: &[usize], n: usize) -> Vec<TopSpecies> {
    let mut ranked: Vec<TopSpecies> = table
        .records
        .iter()
        .map(|record| TopSpecies {
            species: record.species.clone(),
            average_abundance: record.mean(columns),
        })
        .collect();

    ranked.sort_by(|a, b| match (a.average_abundance, b.average_abundance) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked.truncate(n);
    ranked
}

/// Top `n` species per partition.
///
/// Without metadata a single `all` partition covers every sample column.
/// With metadata each status selects the columns whose sample prefix is one
/// of its sample ids; statuses matching no column are skipped.
pub fn select_top_species(
    table: &AbundanceTable,
    metadata: Option<&SampleMetadata>,
    n: usize,
) -> BTreeMap<String, Vec<TopSpecies>> {
    let mut partitions = BTreeMap::new();

    let Some(metadata) = metadata else {
        let columns: Vec<usize> = (0..table.sample_columns.len()).collect();
        partitions.insert(ALL_PARTITION.to_string(), rank_species(table, &columns, n));
        return partitions;
    };

    for (status, samples) in &metadata.groups {
        let columns: Vec<usize> = table
            .sample_columns
            .iter()
            .enumerate()
            .filter(|(_, name)| samples.iter().any(|s| s == sample_prefix(name)))
            .map(|(idx, _)| idx)
            .collect();

        if columns.is_empty() {
            warn!("No valid samples found for status '{}'. Skipping.", status);
            continue;
        }

        partitions.insert(status.clone(), rank_species(table, &columns, n));
    }

    partitions
}

/// Output path of one partition: `{prefix}_{status}.tsv`
pub fn partition_path(prefix: &Path, status: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("_{status}.tsv"));
    PathBuf::from(name)
}

pub fn write_top_species(path: &Path, rows: &[TopSpecies]) -> Result<()> {
    tsv::write_records(path, &TOP_SPECIES_HEADER, rows)
}

pub fn read_top_species(path: &Path) -> Result<Vec<TopSpecies>> {
    tsv::read_records(path)
}

/// Species names from a top-species file
pub fn read_species_names(path: &Path) -> Result<Vec<String>> {
    let rows = read_top_species(path)?;
    if rows.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no species listed in '{}'",
            path.display()
        )));
    }
    Ok(rows.into_iter().map(|r| r.species).collect())
}

/// Full preprocessing step: species-level extraction then top-N per partition.
///
/// Returns the partitions that were written.
pub fn extract_top_species(
    input: &Path,
    species_output: Option<&Path>,
    metadata: Option<&Path>,
    prefix: &Path,
    n: usize,
) -> Result<BTreeMap<String, Vec<TopSpecies>>> {
    let metadata = metadata.map(SampleMetadata::read).transpose()?;

    let table = taxonomy::extract_species_abundance(input, species_output);
    if table.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no species-level abundance in '{}'",
            input.display()
        )));
    }

    let partitions = select_top_species(&table, metadata.as_ref(), n);
    for (status, rows) in &partitions {
        let path = partition_path(prefix, status);
        write_top_species(&path, rows)?;
        if status == ALL_PARTITION {
            info!("Top {} species across all samples saved to {}", n, path.display());
        } else {
            info!("Top {} species for status '{}' saved to {}", n, status, path.display());
        }
    }

    Ok(partitions)
}
