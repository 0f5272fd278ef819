//! Common types used across glypho

use crate::error::{GlyphoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Taxonomy
// ============================================================================

/// Taxonomic rank encoded in MetaPhlAn-style clade strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomicRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Strain,
}

impl TaxonomicRank {
    /// All ranks, most general first
    pub const ALL: [TaxonomicRank; 8] = [
        TaxonomicRank::Kingdom,
        TaxonomicRank::Phylum,
        TaxonomicRank::Class,
        TaxonomicRank::Order,
        TaxonomicRank::Family,
        TaxonomicRank::Genus,
        TaxonomicRank::Species,
        TaxonomicRank::Strain,
    ];

    /// Token prefix used in clade strings, e.g. `s__` for species
    pub fn prefix(self) -> &'static str {
        match self {
            TaxonomicRank::Kingdom => "k__",
            TaxonomicRank::Phylum => "p__",
            TaxonomicRank::Class => "c__",
            TaxonomicRank::Order => "o__",
            TaxonomicRank::Family => "f__",
            TaxonomicRank::Genus => "g__",
            TaxonomicRank::Species => "s__",
            TaxonomicRank::Strain => "t__",
        }
    }

    /// Column name used for this rank in expanded tables
    pub fn as_str(self) -> &'static str {
        match self {
            TaxonomicRank::Kingdom => "kingdom",
            TaxonomicRank::Phylum => "phylum",
            TaxonomicRank::Class => "class",
            TaxonomicRank::Order => "order",
            TaxonomicRank::Family => "family",
            TaxonomicRank::Genus => "genus",
            TaxonomicRank::Species => "species",
            TaxonomicRank::Strain => "strain",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Split a clade token into its rank and name.
    ///
    /// Returns `None` for tokens that carry no known rank prefix.
    pub fn split_token(token: &str) -> Option<(TaxonomicRank, &str)> {
        Self::ALL
            .iter()
            .find_map(|rank| token.strip_prefix(rank.prefix()).map(|name| (*rank, name)))
    }
}

impl std::fmt::Display for TaxonomicRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaxonomicRank {
    type Err = GlyphoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|rank| rank.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GlyphoError::UnknownRank(s.to_string()))
    }
}

/// Rank-by-rank lineage of a single clade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    ranks: [Option<String>; 8],
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rank: TaxonomicRank) -> Option<&str> {
        self.ranks[rank.index()].as_deref()
    }

    pub fn set(&mut self, rank: TaxonomicRank, name: impl Into<String>) {
        self.ranks[rank.index()] = Some(name.into());
    }

    /// Species-level rows have a species rank and no strain rank
    pub fn is_species_level(&self) -> bool {
        self.get(TaxonomicRank::Species).is_some() && self.get(TaxonomicRank::Strain).is_none()
    }

    /// Iterate `(rank, name)` for every rank, set or not
    pub fn iter(&self) -> impl Iterator<Item = (TaxonomicRank, Option<&str>)> + '_ {
        TaxonomicRank::ALL
            .iter()
            .map(move |rank| (*rank, self.get(*rank)))
    }
}

// ============================================================================
// Enzyme Registry
// ============================================================================

/// A pathway enzyme and its Enzyme Commission number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Enzyme {
    /// Gene short name, e.g. `aroA`
    pub name: &'static str,
    /// EC number, e.g. `2.5.1.19`
    pub ec: &'static str,
}

/// The seven shikimate-pathway enzymes; `aroA` (EPSP synthase) is the
/// glyphosate target.
pub static SHIKIMATE_ENZYMES: [Enzyme; 7] = [
    Enzyme {
        name: "aroF_G_H",
        ec: "2.5.1.54",
    },
    Enzyme {
        name: "aroB",
        ec: "4.2.3.4",
    },
    Enzyme {
        name: "aroD",
        ec: "4.2.1.10",
    },
    Enzyme {
        name: "aroE",
        ec: "1.1.1.25",
    },
    Enzyme {
        name: "aroK_L",
        ec: "2.7.1.71",
    },
    Enzyme {
        name: "aroA",
        ec: "2.5.1.19",
    },
    Enzyme {
        name: "aroC",
        ec: "4.2.3.5",
    },
];

/// EC numbers of the shikimate pathway
pub fn shikimate_ecs() -> BTreeSet<String> {
    SHIKIMATE_ENZYMES.iter().map(|e| e.ec.to_string()).collect()
}
