//! Protein prediction over downloaded genome directories
//!
//! Each species directory is processed once: a directory that already holds a
//! protein FASTA (`.faa` / `.faa.gz`) is left alone. Otherwise the genome
//! FASTA is run through the gene predictor and the protein output is gzipped.

use crate::config::ProdigalConfig;
use crate::error::{PipelineError, Result};
use crate::progress;
use glypho_common::compression::{gunzip_file, gzip_file};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info, warn};

/// Number of stderr lines kept in tool failure messages
const STDERR_TAIL_LINES: usize = 20;

/// Something that turns a genome FASTA into a protein FASTA
pub trait GenePredictor {
    fn name(&self) -> &str;

    fn predict(&self, genome: &Path, proteins: &Path) -> Result<()>;
}

/// Prodigal invoked as `prodigal -i <genome> -a <proteins> -p <mode>`
#[derive(Debug, Clone)]
pub struct ProdigalRunner {
    binary: String,
    mode: String,
}

impl ProdigalRunner {
    pub fn new(config: &ProdigalConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            mode: config.mode.clone(),
        }
    }
}

impl GenePredictor for ProdigalRunner {
    fn name(&self) -> &str {
        &self.binary
    }

    fn predict(&self, genome: &Path, proteins: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-i")
            .arg(genome)
            .arg("-a")
            .arg(proteins)
            .arg("-p")
            .arg(&self.mode)
            .output()
            .map_err(|e| PipelineError::external_tool(&self.binary, format!("failed to start: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(PipelineError::external_tool(
                &self.binary,
                format!("exited with {}: {}", output.status, tail),
            ));
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Existing protein FASTA in `dir`, if any
pub fn find_protein_file(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(sorted_files(dir)?.into_iter().find(|p| {
        let name = file_name(p);
        name.ends_with(".faa") || name.ends_with(".faa.gz")
    }))
}

/// Where the genome FASTA comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeSource {
    Plain(PathBuf),
    Gzipped(PathBuf),
}

/// Pick the genome FASTA of `dir`.
///
/// Uncompressed `.fna` beats `.fna.gz`; within each, the whole-genome file
/// beats derived `*_from_genomic` files.
pub fn select_genome(dir: &Path) -> Result<Option<GenomeSource>> {
    let files = sorted_files(dir)?;
    let pick = |suffix: &str| -> Option<PathBuf> {
        let candidates: Vec<&PathBuf> = files.iter().filter(|p| file_name(p).ends_with(suffix)).collect();
        candidates
            .iter()
            .find(|p| !file_name(p).contains("_from_genomic"))
            .or_else(|| candidates.first())
            .map(|p| (*p).clone())
    };

    if let Some(path) = pick(".fna") {
        return Ok(Some(GenomeSource::Plain(path)));
    }
    Ok(pick(".fna.gz").map(GenomeSource::Gzipped))
}

/// Result of processing one species directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesDirOutcome {
    /// A protein file was already present
    AlreadyPredicted(PathBuf),
    /// No genome FASTA to predict from
    NoGenome,
    /// Proteins predicted and written to this `.faa.gz`
    Predicted(PathBuf),
}

fn predict_and_pack(
    predictor: &dyn GenePredictor,
    genome: &Path,
    proteins: &Path,
    staged: &Path,
    archive: &Path,
) -> Result<()> {
    predictor.predict(genome, proteins)?;
    gzip_file(proteins, staged)?;
    std::fs::rename(staged, archive)?;
    Ok(())
}

/// Predict proteins for one species directory
pub fn process_species_dir(predictor: &dyn GenePredictor, dir: &Path) -> Result<SpeciesDirOutcome> {
    if let Some(existing) = find_protein_file(dir)? {
        info!("{} already exists in {}, skipping.", file_name(&existing), dir.display());
        return Ok(SpeciesDirOutcome::AlreadyPredicted(existing));
    }

    let genome = match select_genome(dir)? {
        Some(GenomeSource::Plain(path)) => path,
        Some(GenomeSource::Gzipped(archive)) => {
            let target = archive.with_extension("");
            let staged = archive.with_extension("part");
            info!("Decompressing {} ...", archive.display());
            let unpacked = gunzip_file(&archive, &staged).and_then(|_| Ok(std::fs::rename(&staged, &target)?));
            if let Err(e) = unpacked {
                let _ = std::fs::remove_file(&staged);
                return Err(e.into());
            }
            target
        },
        None => {
            warn!("No .fna or .fna.gz file found in {}, skipping.", dir.display());
            return Ok(SpeciesDirOutcome::NoGenome);
        },
    };

    // Work files end in `.part` so an interrupted run is never taken as done
    let proteins = genome.with_extension("faa.part");
    let staged = genome.with_extension("faa.gz.part");
    let archive = genome.with_extension("faa.gz");

    info!("Running {} on {} ...", predictor.name(), genome.display());
    let written = predict_and_pack(predictor, &genome, &proteins, &staged, &archive);

    for leftover in [&proteins, &staged] {
        if leftover.exists() {
            if let Err(e) = std::fs::remove_file(leftover) {
                warn!("Could not remove {}: {}", leftover.display(), e);
            }
        }
    }
    written?;
    info!("Created: {}", archive.display());

    Ok(SpeciesDirOutcome::Predicted(archive))
}

/// Counts over a whole taxa directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionSummary {
    pub predicted: usize,
    pub skipped: usize,
    pub no_genome: usize,
    pub failed: usize,
}

/// Process every species subdirectory of `taxa_dir`, in name order.
///
/// A failing directory is logged and counted; the others still run.
pub fn run_all(predictor: &dyn GenePredictor, taxa_dir: &Path, show_progress: bool) -> Result<PredictionSummary> {
    if !taxa_dir.is_dir() {
        return Err(PipelineError::FileNotFound(taxa_dir.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(taxa_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let pb = progress::step_bar(dirs.len() as u64, "Predicting proteins", show_progress);
    let mut summary = PredictionSummary::default();

    for dir in &dirs {
        match process_species_dir(predictor, dir) {
            Ok(SpeciesDirOutcome::Predicted(_)) => summary.predicted += 1,
            Ok(SpeciesDirOutcome::AlreadyPredicted(_)) => summary.skipped += 1,
            Ok(SpeciesDirOutcome::NoGenome) => summary.no_genome += 1,
            Err(e) => {
                error!("Failed to process {}: {}", dir.display(), e);
                summary.failed += 1;
            },
        }
        pb.inc(1);
    }
    pb.finish_with_message("Protein prediction complete");

    info!(
        predicted = summary.predicted,
        skipped = summary.skipped,
        no_genome = summary.no_genome,
        failed = summary.failed,
        "Processed {} species directories",
        dirs.len()
    );
    Ok(summary)
}
