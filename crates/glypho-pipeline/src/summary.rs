//! Pathway completeness per species and per taxon

use crate::error::{PipelineError, Result};
use crate::taxonomy::AbundanceTable;
use crate::tsv::{self, Table};
use crate::uniprot::UniProtHit;
use glypho_common::TaxonomicRank;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Default name of DeepEC result files
pub const DEEPEC_RESULT_FILE: &str = "DeepECv2_result.txt";

/// Column of DeepEC results holding `EC:<number>`
const DEEPEC_PREDICTION_COLUMN: &str = "prediction";

/// Completeness at or above which a species counts as complete
pub const DEFAULT_COMPLETE_THRESHOLD: f64 = 100.0;

pub const SUMMARY_HEADER: [&str; 4] = ["Species", "Detected ECs", "Completeness (%)", "Status"];

pub const TAXA_COMPLETION_HEADER: [&str; 3] = ["Taxon", "Complete", "Incomplete"];

/// One EC number observed for one species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcDetection {
    pub species: String,
    pub ec: String,
}

/// EC detections carried by tagged UniProt hits
pub fn detections_from_hits(hits: &[UniProtHit]) -> Vec<EcDetection> {
    hits.iter()
        .filter_map(|hit| hit.species.as_deref().map(|s| (s, hit)))
        .flat_map(|(species, hit)| {
            hit.ec_numbers().map(move |ec| EcDetection {
                species: species.to_string(),
                ec: ec.to_string(),
            })
        })
        .collect()
}

/// Pathway completeness of one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessSummary {
    #[serde(rename = "Species")]
    pub species: String,

    #[serde(
        rename = "Detected ECs",
        serialize_with = "serialize_ec_set",
        deserialize_with = "deserialize_ec_set"
    )]
    pub detected_ecs: BTreeSet<String>,

    #[serde(rename = "Completeness (%)")]
    pub completeness: f64,

    #[serde(rename = "Status")]
    pub status: String,
}

fn serialize_ec_set<S: Serializer>(ecs: &BTreeSet<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let joined: Vec<&str> = ecs.iter().map(String::as_str).collect();
    serializer.serialize_str(&joined.join(","))
}

fn deserialize_ec_set<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|ec| !ec.is_empty())
        .map(str::to_string)
        .collect())
}

/// Completeness of every species with at least one target EC.
///
/// Species are grouped in name order, then stably sorted by completeness,
/// highest first.
pub fn summarize_ec_completeness(
    detections: &[EcDetection],
    targets: &BTreeSet<String>,
    status: &str,
) -> Vec<CompletenessSummary> {
    let mut per_species: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for detection in detections.iter().filter(|d| targets.contains(&d.ec)) {
        per_species
            .entry(detection.species.as_str())
            .or_default()
            .insert(detection.ec.clone());
    }

    let mut summary: Vec<CompletenessSummary> = per_species
        .into_iter()
        .map(|(species, ecs)| CompletenessSummary {
            species: species.to_string(),
            completeness: ecs.len() as f64 / targets.len() as f64 * 100.0,
            detected_ecs: ecs,
            status: status.to_string(),
        })
        .collect();

    summary.sort_by(|a, b| b.completeness.partial_cmp(&a.completeness).unwrap_or(Ordering::Equal));
    summary
}

pub fn write_summary(path: &Path, rows: &[CompletenessSummary]) -> Result<()> {
    tsv::write_records(path, &SUMMARY_HEADER, rows)
}

pub fn read_summary(path: &Path) -> Result<Vec<CompletenessSummary>> {
    tsv::read_records(path)
}

/// Load DeepEC predictions from `{root}/<species>/.../{file_name}`.
///
/// The species is the name of the directory holding each result file.
pub fn load_deepec_results(root: &Path, file_name: &str) -> Result<Vec<EcDetection>> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable path under {}: {}", root.display(), e);
                None
            },
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no DeepEC result files named '{}' under '{}'",
            file_name,
            root.display()
        )));
    }

    let mut detections = Vec::new();
    for path in &files {
        let species = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let table = Table::read(path)?;
        for prediction in table.column(DEEPEC_PREDICTION_COLUMN)? {
            let Some(ec) = prediction.split(':').nth(1).map(str::trim).filter(|ec| !ec.is_empty()) else {
                continue;
            };
            detections.push(EcDetection {
                species: species.clone(),
                ec: ec.to_string(),
            });
        }
    }

    info!("Loaded {} EC predictions from {} DeepEC files", detections.len(), files.len());
    Ok(detections)
}

/// Complete / incomplete species counts for one taxon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxaCompletion {
    #[serde(rename = "Taxon")]
    pub taxon: String,
    #[serde(rename = "Complete")]
    pub complete: usize,
    #[serde(rename = "Incomplete")]
    pub incomplete: usize,
}

impl TaxaCompletion {
    pub fn total(&self) -> usize {
        self.complete + self.incomplete
    }
}

/// Count complete and incomplete species per taxon.
///
/// `rows` pairs each species' taxon (at the chosen rank) with its
/// completeness; rows without a taxon are dropped. Taxa come out in name
/// order.
pub fn summarize_taxa_completion<'a>(
    rows: impl IntoIterator<Item = (Option<&'a str>, f64)>,
    threshold: f64,
) -> Vec<TaxaCompletion> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (taxon, completeness) in rows {
        let Some(taxon) = taxon else {
            continue;
        };
        let entry = counts.entry(taxon).or_default();
        if completeness >= threshold {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(taxon, (complete, incomplete))| TaxaCompletion {
            taxon: taxon.to_string(),
            complete,
            incomplete,
        })
        .collect()
}

/// [`summarize_taxa_completion`] with taxa looked up from a species table
pub fn taxa_completion_from_table(
    summary: &[CompletenessSummary],
    species_table: &AbundanceTable,
    rank: TaxonomicRank,
    threshold: f64,
) -> Vec<TaxaCompletion> {
    summarize_taxa_completion(
        summary.iter().map(|row| {
            let taxon = species_table
                .lineage_of(&row.species)
                .and_then(|lineage| lineage.get(rank));
            (taxon, row.completeness)
        }),
        threshold,
    )
}

pub fn write_taxa_completion(path: &Path, rows: &[TaxaCompletion]) -> Result<()> {
    tsv::write_records(path, &TAXA_COMPLETION_HEADER, rows)
}

pub fn read_taxa_completion(path: &Path) -> Result<Vec<TaxaCompletion>> {
    tsv::read_records(path)
}
