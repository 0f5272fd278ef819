//! Glypho Pipeline Library
//!
//! Surveys the shikimate pathway (the glyphosate target) across the species
//! of metagenomic samples.
//!
//! # Overview
//!
//! - **Taxonomy**: species-level abundance from MetaPhlAn-style profiles (`glypho extract-top-species`)
//! - **Top-N**: most abundant species, overall or per sample status
//! - **UniProt**: pathway enzyme hits per species (`glypho combine-outputs`, `glypho add-ec-from-uniref`)
//! - **NCBI**: latest genome assemblies per species (`glypho download-top-taxa`)
//! - **Prodigal**: protein prediction over downloaded genomes (`glypho run-prodigal`)
//! - **Summary**: pathway completeness per species and taxon (`glypho summarize`, `glypho plot`)
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ncbi;
pub mod plot;
pub mod prodigal;
pub mod progress;
pub mod summary;
pub mod taxonomy;
pub mod top_n;
pub mod tsv;
pub mod uniprot;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};

use clap::{Parser, Subcommand};
use glypho_common::TaxonomicRank;
use std::path::PathBuf;

/// Default directory for downloaded assemblies
pub const DEFAULT_DOWNLOAD_DIR: &str = "./data/downloads";

/// Glypho - shikimate pathway survey of metagenomic species
#[derive(Parser, Debug)]
#[command(name = "glypho")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, env = "GLYPHO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print the CLI reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract species-level abundance and the top N species
    ExtractTopSpecies {
        /// Raw taxonomic abundance profile (TSV)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to save the species-level table with taxonomy
        #[arg(short, long)]
        species_output: Option<PathBuf>,

        /// Metadata with 'sample_name' and 'Status' columns
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output prefix; files are written as <prefix>_<status>.tsv
        #[arg(short, long, default_value = "top_species")]
        prefix: PathBuf,

        /// Number of species to keep per partition
        #[arg(short = 'n', long, default_value_t = 100)]
        top_n: usize,
    },

    /// Search UniProt for every pathway enzyme of every top species
    CombineOutputs {
        /// Top species file (Species, Average_Abundance)
        #[arg(short, long)]
        top_species: PathBuf,

        /// Where to save the concatenated hits
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Add hits found through the UniRef90 clusters of existing hits
    AddEcFromUniref {
        /// Existing UniProt hits; generated from --top-species when absent
        #[arg(short, long)]
        result_file: Option<PathBuf>,

        /// Top species file, required without --result-file
        #[arg(short, long, required_unless_present = "result_file")]
        top_species: Option<PathBuf>,

        /// Where to save the UniRef90-derived hits
        #[arg(short, long)]
        output: PathBuf,

        /// Where to save hits generated from --top-species
        #[arg(long)]
        combined_output: Option<PathBuf>,

        /// Concurrent UniProt queries (defaults to the configured value)
        #[arg(short = 'w', long)]
        max_workers: Option<usize>,

        /// Look up UniRef90 clusters for hits that carry none
        #[arg(long)]
        resolve_uniref90: bool,
    },

    /// Download genome assemblies for the top species
    DownloadTopTaxa {
        /// Top species file (Species, Average_Abundance)
        #[arg(short, long)]
        top_species: Option<PathBuf>,

        /// Raw abundance profile, used when no top species file is given
        #[arg(short, long, required_unless_present = "top_species")]
        abundance: Option<PathBuf>,

        /// Directory to save downloaded files
        #[arg(short, long, default_value = DEFAULT_DOWNLOAD_DIR)]
        output_dir: PathBuf,

        /// Number of species taken from the abundance profile
        #[arg(short = 'n', long, default_value_t = 100)]
        top_n: usize,
    },

    /// Download the genome assembly of a single species
    DownloadGenome {
        /// Species name or query (underscores or spaces)
        species: String,

        /// Directory to save downloaded files
        #[arg(short, long, default_value = DEFAULT_DOWNLOAD_DIR)]
        output_dir: PathBuf,
    },

    /// Predict proteins for every species directory that has none yet
    RunProdigal {
        /// Directory containing one subdirectory per species
        taxa_dir: PathBuf,
    },

    /// Search UniProt for one organism
    SearchUniprot {
        /// Organism name
        #[arg(long)]
        organism: String,

        /// EC number to search for
        #[arg(long, conflicts_with = "uniref90", required_unless_present = "uniref90")]
        ec: Option<String>,

        /// UniRef90 cluster id to search for
        #[arg(long)]
        uniref90: Option<String>,

        /// Write hits here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize pathway completeness per species
    Summarize {
        /// UniProt hits tagged with Species
        #[arg(long, conflicts_with = "deepec_dir", required_unless_present = "deepec_dir")]
        hits: Option<PathBuf>,

        /// Directory of per-species DeepEC result folders
        #[arg(long)]
        deepec_dir: Option<PathBuf>,

        /// DeepEC result file name
        #[arg(long, default_value = summary::DEEPEC_RESULT_FILE)]
        deepec_file: String,

        /// Status label attached to every row
        #[arg(short, long, default_value = top_n::ALL_PARTITION)]
        status: String,

        /// Where to save the completeness summary
        #[arg(short, long)]
        output: PathBuf,

        /// Species-level table with taxonomy, for per-taxon counts
        #[arg(long, requires = "taxa_output")]
        species_table: Option<PathBuf>,

        /// Where to save complete/incomplete counts per taxon
        #[arg(long, requires = "species_table")]
        taxa_output: Option<PathBuf>,

        /// Rank used for per-taxon counts
        #[arg(long, default_value = "genus")]
        rank: TaxonomicRank,

        /// Completeness (%) at which a species counts as complete
        #[arg(long, default_value_t = summary::DEFAULT_COMPLETE_THRESHOLD)]
        threshold: f64,
    },

    /// Render SVG charts
    Plot {
        #[command(subcommand)]
        command: PlotCommand,
    },
}

/// Plot subcommands
#[derive(Subcommand, Debug)]
pub enum PlotCommand {
    /// Stacked taxonomic composition of top species per group
    Composition {
        /// Group and its top species file, as LABEL=PATH (repeatable)
        #[arg(short, long = "group", value_parser = parse_group, required = true)]
        groups: Vec<(String, PathBuf)>,

        /// Species-level table with taxonomy
        #[arg(long)]
        species_table: PathBuf,

        /// Rank to summarize at
        #[arg(short, long, default_value = "phylum")]
        rank: TaxonomicRank,

        /// Taxa shown individually; the rest become 'Other'
        #[arg(short = 'n', long, default_value_t = 10)]
        top_n: usize,

        /// Output SVG
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Complete vs incomplete species per taxon
    TaxaCompletion {
        /// Per-taxon counts written by `glypho summarize --taxa-output`
        #[arg(short, long)]
        input: PathBuf,

        /// Output SVG
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Overlap of the species of two tables
    Venn {
        /// First table with a Species column
        #[arg(long)]
        left: PathBuf,

        /// Second table with a Species column
        #[arg(long)]
        right: PathBuf,

        /// Label of the first set
        #[arg(long, default_value = "left")]
        left_label: String,

        /// Label of the second set
        #[arg(long, default_value = "right")]
        right_label: String,

        /// Output SVG
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Parse `LABEL=PATH`
fn parse_group(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => {
            Ok((label.to_string(), PathBuf::from(path)))
        },
        _ => Err(format!("expected LABEL=PATH, got '{value}'")),
    }
}
