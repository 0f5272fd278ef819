//! Taxonomic abundance profile parsing
//!
//! Profiles (MetaPhlAn style) carry one row per clade. The clade column holds
//! rank-prefixed tokens joined by `|`:
//!
//! ```text
//! k__Bacteria|p__Proteobacteria|...|g__Escherichia|s__Escherichia_coli
//! ```
//!
//! Rows are expanded into per-rank columns and filtered to species level
//! (species rank present, strain rank absent).

use crate::error::{PipelineError, Result};
use crate::tsv::{self, Table};
use glypho_common::{Lineage, TaxonomicRank};
use std::path::Path;
use tracing::{error, info, warn};

/// Column holding the clade string in raw profiles
pub const DEFAULT_CLADE_COLUMN: &str = "clade_name";

/// Separator between clade tokens
pub const CLADE_SEPARATOR: char = '|';

/// Column holding the species name in expanded tables
pub const SPECIES_COLUMN: &str = "Species";

/// Non-numeric columns carried through unchanged
pub const PASSTHROUGH_COLUMNS: [&str; 3] = ["NCBI_tax_id", "clade_taxid", "additional_species"];

/// Expand a clade string into its lineage.
///
/// Tokens without a known rank prefix are ignored.
pub fn expand_clade(clade: &str, sep: char) -> Lineage {
    let mut lineage = Lineage::new();
    for token in clade.split(sep) {
        if let Some((rank, name)) = TaxonomicRank::split_token(token.trim()) {
            lineage.set(rank, name);
        }
    }
    lineage
}

/// Species name from a clade string: text after `s__` up to whitespace or
/// the separator.
pub fn species_token(clade: &str, sep: char) -> Option<&str> {
    let start = clade.find(TaxonomicRank::Species.prefix())? + TaxonomicRank::Species.prefix().len();
    let rest = &clade[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == sep)
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// One species-level row
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRecord {
    pub species: String,
    pub lineage: Lineage,
    pub passthrough: Vec<String>,
    pub abundances: Vec<Option<f64>>,
}

impl AbundanceRecord {
    /// Mean over the given sample columns, skipping missing values
    pub fn mean(&self, columns: &[usize]) -> Option<f64> {
        let values: Vec<f64> = columns
            .iter()
            .filter_map(|&idx| self.abundances.get(idx).copied().flatten())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

/// Species-by-sample abundance matrix with taxonomy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbundanceTable {
    pub passthrough_columns: Vec<String>,
    pub sample_columns: Vec<String>,
    pub records: Vec<AbundanceRecord>,
}

impl AbundanceTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Expand a raw profile and keep species-level rows
    pub fn from_profile(table: &Table, clade_column: &str, sep: char) -> Result<Self> {
        let clade_idx = table.column_index(clade_column)?;
        let (passthrough, samples) = split_columns(table, &[clade_idx]);

        let mut records = Vec::new();
        for row in &table.rows {
            let clade = row.get(clade_idx).map(String::as_str).unwrap_or("");
            let lineage = expand_clade(clade, sep);
            if !lineage.is_species_level() {
                continue;
            }
            let Some(species) = species_token(clade, sep) else {
                continue;
            };

            records.push(AbundanceRecord {
                species: species.to_string(),
                lineage,
                passthrough: passthrough.iter().map(|&i| cell(row, i).to_string()).collect(),
                abundances: parse_abundances(table, row, &samples)?,
            });
        }

        Ok(Self {
            passthrough_columns: passthrough.iter().map(|&i| table.headers[i].clone()).collect(),
            sample_columns: samples.iter().map(|&i| table.headers[i].clone()).collect(),
            records,
        })
    }

    /// Load a table previously written by [`AbundanceTable::write`]
    pub fn read(path: &Path) -> Result<Self> {
        let table = Table::read(path)?;
        let species_idx = table.column_index(SPECIES_COLUMN)?;
        let rank_idx: Vec<(TaxonomicRank, usize)> = TaxonomicRank::ALL
            .iter()
            .filter_map(|rank| table.column_index(rank.as_str()).ok().map(|i| (*rank, i)))
            .collect();

        let mut skip = vec![species_idx];
        skip.extend(rank_idx.iter().map(|(_, i)| *i));
        let (passthrough, samples) = split_columns(&table, &skip);

        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let mut lineage = Lineage::new();
            for (rank, idx) in &rank_idx {
                let value = cell(row, *idx);
                if !tsv::is_missing(value) {
                    lineage.set(*rank, value);
                }
            }
            records.push(AbundanceRecord {
                species: cell(row, species_idx).to_string(),
                lineage,
                passthrough: passthrough.iter().map(|&i| cell(row, i).to_string()).collect(),
                abundances: parse_abundances(&table, row, &samples)?,
            });
        }

        Ok(Self {
            passthrough_columns: passthrough.iter().map(|&i| table.headers[i].clone()).collect(),
            sample_columns: samples.iter().map(|&i| table.headers[i].clone()).collect(),
            records,
        })
    }

    /// Write as TSV: Species, passthrough, samples, then kingdom..strain
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header = vec![SPECIES_COLUMN.to_string()];
        header.extend(self.passthrough_columns.iter().cloned());
        header.extend(self.sample_columns.iter().cloned());
        header.extend(TaxonomicRank::ALL.iter().map(|r| r.as_str().to_string()));

        let rows: Vec<Vec<String>> = self
            .records
            .iter()
            .map(|record| {
                let mut row = vec![record.species.clone()];
                row.extend(record.passthrough.iter().cloned());
                row.extend(
                    record
                        .abundances
                        .iter()
                        .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
                );
                row.extend(record.lineage.iter().map(|(_, name)| name.unwrap_or("").to_string()));
                row
            })
            .collect();

        tsv::write_rows(path, &header, &rows)
    }

    /// Lineage of the first record for `species`
    pub fn lineage_of(&self, species: &str) -> Option<&Lineage> {
        self.records
            .iter()
            .find(|r| r.species == species)
            .map(|r| &r.lineage)
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Partition non-skipped columns into (passthrough, sample) indices
fn split_columns(table: &Table, skip: &[usize]) -> (Vec<usize>, Vec<usize>) {
    (0..table.headers.len())
        .filter(|i| !skip.contains(i))
        .partition(|&i| PASSTHROUGH_COLUMNS.contains(&table.headers[i].as_str()))
}

fn parse_abundances(table: &Table, row: &[String], samples: &[usize]) -> Result<Vec<Option<f64>>> {
    samples
        .iter()
        .map(|&i| {
            let value = cell(row, i);
            if tsv::is_missing(value) {
                return Ok(None);
            }
            value.trim().parse::<f64>().map(Some).map_err(|_| {
                PipelineError::invalid_table(
                    &table.name,
                    format!("non-numeric abundance '{}' in column '{}'", value, table.headers[i]),
                )
            })
        })
        .collect()
}

/// Extract the species-level table from a raw profile.
///
/// Writes the expanded table to `output` when given. A missing or unparsable
/// input is logged and yields an empty table.
pub fn extract_species_abundance(input: &Path, output: Option<&Path>) -> AbundanceTable {
    match try_extract_species_abundance(input, output) {
        Ok(table) => table,
        Err(PipelineError::FileNotFound(path)) => {
            error!("Abundance file '{}' not found", path.display());
            AbundanceTable::default()
        },
        Err(e) => {
            error!(error = %e, input = %input.display(), "Failed to extract species abundance");
            AbundanceTable::default()
        },
    }
}

/// Fallible form of [`extract_species_abundance`]
pub fn try_extract_species_abundance(input: &Path, output: Option<&Path>) -> Result<AbundanceTable> {
    let raw = Table::read(input)?;
    let table = AbundanceTable::from_profile(&raw, DEFAULT_CLADE_COLUMN, CLADE_SEPARATOR)?;

    if table.is_empty() {
        warn!(input = %input.display(), "No species-level rows in profile");
    }

    if let Some(output) = output {
        table.write(output)?;
        info!(
            "Species-level abundance with taxonomy ({} species, {} samples) written to '{}'",
            table.len(),
            table.sample_columns.len(),
            output.display()
        );
    }

    Ok(table)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const PROFILE: &str = "#mpa_vJun23_CHOCOPhlAnSGB_202307
clade_name\tNCBI_tax_id\tS1_a\tS2_a
k__Bacteria\t2\t100.0\t100.0
k__Bacteria|p__Proteobacteria|c__Gammaproteobacteria|o__Enterobacterales|f__Enterobacteriaceae|g__Escherichia\t2|1224|1236|91347|543|561\t30.0\t10.0
k__Bacteria|p__Proteobacteria|c__Gammaproteobacteria|o__Enterobacterales|f__Enterobacteriaceae|g__Escherichia|s__Escherichia_coli\t2|1224|1236|91347|543|561|562\t30.0\t10.0
k__Bacteria|p__Proteobacteria|c__Gammaproteobacteria|o__Enterobacterales|f__Enterobacteriaceae|g__Escherichia|s__Escherichia_coli|t__SGB10068\t\t30.0\t10.0
k__Bacteria|p__Bacteroidetes|c__Bacteroidia|o__Bacteroidales|f__Bacteroidaceae|g__Bacteroides|s__Bacteroides_fragilis\t\t5.0\t
";

    fn profile_table() -> Table {
        Table::from_reader("profile", PROFILE.as_bytes(), true).unwrap()
    }

    #[test]
    fn test_expand_clade() {
        let lineage = expand_clade("k__Bacteria|p__Firmicutes|x__junk|g__Roseburia", '|');
        assert_eq!(lineage.get(TaxonomicRank::Kingdom), Some("Bacteria"));
        assert_eq!(lineage.get(TaxonomicRank::Phylum), Some("Firmicutes"));
        assert_eq!(lineage.get(TaxonomicRank::Genus), Some("Roseburia"));
        assert_eq!(lineage.get(TaxonomicRank::Class), None);
    }

    #[test]
    fn test_species_token() {
        assert_eq!(species_token("k__Bacteria|s__Foo_bar", '|'), Some("Foo_bar"));
        assert_eq!(species_token("k__Bacteria|s__Foo|t__SGB1", '|'), Some("Foo"));
        assert_eq!(species_token("k__Bacteria|g__Foo", '|'), None);
        assert_eq!(species_token("k__Bacteria|s__", '|'), None);
    }

    #[test]
    fn test_from_profile_keeps_species_level_only() {
        let table = AbundanceTable::from_profile(&profile_table(), DEFAULT_CLADE_COLUMN, '|').unwrap();

        assert_eq!(table.passthrough_columns, vec!["NCBI_tax_id"]);
        assert_eq!(table.sample_columns, vec!["S1_a", "S2_a"]);
        let species: Vec<&str> = table.records.iter().map(|r| r.species.as_str()).collect();
        assert_eq!(species, vec!["Escherichia_coli", "Bacteroides_fragilis"]);
        assert_eq!(table.records[1].abundances, vec![Some(5.0), None]);
        assert_eq!(
            table.lineage_of("Bacteroides_fragilis").unwrap().get(TaxonomicRank::Genus),
            Some("Bacteroides")
        );
    }

    #[test]
    fn test_mean_skips_missing() {
        let table = AbundanceTable::from_profile(&profile_table(), DEFAULT_CLADE_COLUMN, '|').unwrap();
        assert_eq!(table.records[0].mean(&[0, 1]), Some(20.0));
        assert_eq!(table.records[1].mean(&[0, 1]), Some(5.0));
        assert_eq!(table.records[1].mean(&[1]), None);
    }

    #[test]
    fn test_non_numeric_abundance_is_error() {
        let raw = Table::from_reader("bad", "clade_name\tS1\nk__B|s__Foo\tlots\n".as_bytes(), true).unwrap();
        let err = AbundanceTable::from_profile(&raw, DEFAULT_CLADE_COLUMN, '|').unwrap_err();
        assert!(err.to_string().contains("non-numeric abundance 'lots'"));
    }

    #[test]
    fn test_extract_missing_file_returns_empty() {
        let table = extract_species_abundance(Path::new("/nonexistent/profile.tsv"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_write_then_read_species_table() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("profile.tsv");
        let output = dir.path().join("species.tsv");
        std::fs::write(&input, PROFILE).unwrap();

        let extracted = extract_species_abundance(&input, Some(&output));
        assert_eq!(extracted.len(), 2);

        let written = std::fs::read_to_string(&output).unwrap();
        let header = written.lines().next().unwrap();
        assert_eq!(
            header,
            "Species\tNCBI_tax_id\tS1_a\tS2_a\tkingdom\tphylum\tclass\torder\tfamily\tgenus\tspecies\tstrain"
        );

        let reread = AbundanceTable::read(&output).unwrap();
        assert_eq!(reread.sample_columns, extracted.sample_columns);
        assert_eq!(reread.records[0].species, "Escherichia_coli");
        assert_eq!(reread.records[0].lineage, extracted.records[0].lineage);
        assert_eq!(reread.records[1].abundances, vec![Some(5.0), None]);
    }

    proptest! {
        #[test]
        fn prop_species_round_trips(
            genus in "[A-Z][a-z]{2,12}",
            epithet in "[a-z]{2,12}",
        ) {
            let species = format!("{genus}_{epithet}");
            let clade = format!("k__Bacteria|p__Firmicutes|g__{genus}|s__{species}");
            let lineage = expand_clade(&clade, '|');
            prop_assert!(lineage.is_species_level());
            prop_assert_eq!(lineage.get(TaxonomicRank::Species), Some(species.as_str()));
            prop_assert_eq!(species_token(&clade, '|'), Some(species.as_str()));
        }
    }
}
