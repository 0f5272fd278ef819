//! UniProt query and result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields requested from `uniprotkb/search`
pub const SEARCH_FIELDS: &str = "accession,id,protein_name,organism_name,ec";

/// Column order of written hit tables
pub const HIT_HEADER: [&str; 8] = [
    "Entry",
    "Entry Name",
    "Protein names",
    "Organism",
    "EC number",
    "UniRef90",
    "Species",
    "Enzyme",
];

/// The filter combined with the organism clause.
///
/// A query carries exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryFilter {
    Ec(String),
    UniRef90(String),
}

impl QueryFilter {
    fn clause(&self) -> String {
        match self {
            QueryFilter::Ec(ec) => format!("ec:{ec}"),
            QueryFilter::UniRef90(id) => format!("uniref_cluster_90:{id}"),
        }
    }

    /// Cluster id when this filter is a UniRef90 filter
    pub fn uniref90(&self) -> Option<&str> {
        match self {
            QueryFilter::UniRef90(id) => Some(id),
            QueryFilter::Ec(_) => None,
        }
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause())
    }
}

/// Organism names are sent with spaces, e.g. `Escherichia coli`
pub fn organism_query_name(organism: &str) -> String {
    organism.replace('_', " ")
}

/// `organism_name:"<organism>" AND <filter>`
pub fn build_query(organism: &str, filter: &QueryFilter) -> String {
    format!(
        "organism_name:\"{}\" AND {}",
        organism_query_name(organism),
        filter.clause()
    )
}

/// One UniProtKB entry, optionally tagged by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniProtHit {
    #[serde(rename = "Entry")]
    pub accession: String,

    #[serde(rename = "Entry Name", default)]
    pub id: String,

    #[serde(rename = "Protein names", default)]
    pub protein_name: String,

    #[serde(rename = "Organism", default)]
    pub organism: String,

    /// Semicolon-separated when the entry has several
    #[serde(rename = "EC number", default)]
    pub ec: String,

    #[serde(rename = "UniRef90", default)]
    pub uniref90: Option<String>,

    #[serde(rename = "Species", default)]
    pub species: Option<String>,

    #[serde(rename = "Enzyme", default)]
    pub enzyme: Option<String>,
}

impl UniProtHit {
    /// Individual EC numbers of this entry
    pub fn ec_numbers(&self) -> impl Iterator<Item = &str> {
        self.ec.split(';').map(str::trim).filter(|ec| !ec.is_empty())
    }

    /// Non-empty UniRef90 cluster id
    pub fn uniref90_id(&self) -> Option<&str> {
        self.uniref90.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}
