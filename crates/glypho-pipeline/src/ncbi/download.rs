//! Genome assembly download
//!
//! Resolves a species query to a taxon that has an assembly, locates the
//! assembly's directory on the NCBI file server and fetches its genomic,
//! protein and CDS archives into `{output}/{species}`.

use super::eutils::{assembly_term, ftp_to_https, EutilsClient};
use crate::error::{PipelineError, Result};
use crate::progress;
use futures::StreamExt;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Taxonomy hits checked for an assembly, in rank order
const TAXONOMY_RETMAX: usize = 20;

/// Suffix of archives still being written
const PARTIAL_SUFFIX: &str = ".part";

/// Archive names fetched from an assembly directory
const ASSET_PATTERN: &str = r"^GC[AF]_.+_(genomic|protein|cds_from_genomic)[^/]*\.gz$";

/// A query resolved to a taxon with at least one assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpecies {
    pub scientific_name: String,
    pub taxid: String,
    pub assembly_uid: String,
}

/// What happened to one species
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The species directory already existed
    AlreadyPresent(PathBuf),
    /// No taxon with an assembly matched the query
    NoMatch,
    /// The assembly has neither a RefSeq nor a GenBank path
    NoAssemblyPath { accession: String },
    /// The assembly directory lists no matching archives
    NoFiles { url: String },
    /// Archives fetched; `failed` counts per-file failures
    Downloaded {
        dir: PathBuf,
        downloaded: usize,
        failed: usize,
    },
    /// Every listed archive failed; no species directory is left behind
    AllFailed { failed: usize },
}

/// Species directory name: spaces become underscores
pub fn species_dir_name(query: &str) -> String {
    query.replace(' ', "_")
}

/// Taxonomy search term: underscores become spaces
pub fn taxonomy_term(query: &str) -> String {
    query.replace('_', " ")
}

/// Whether `dir` holds at least one completely downloaded file
fn holds_downloads(dir: &Path) -> Result<bool> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let complete = !entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX);
        if complete && entry.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Archive names linked from an assembly directory listing, deduplicated
pub fn parse_listing(html: &str) -> Result<Vec<String>> {
    let pattern = Regex::new(ASSET_PATTERN)?;
    let selector = Selector::parse("a[href]")
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("invalid link selector: {e:?}")))?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let name = href.trim_end_matches('/').rsplit('/').next().unwrap_or(href);
        if pattern.is_match(name) && seen.insert(name.to_string()) {
            files.push(name.to_string());
        }
    }
    Ok(files)
}

/// Sequential genome downloader
pub struct GenomeDownloader {
    eutils: EutilsClient,
    output_dir: PathBuf,
    show_progress: bool,
}

impl GenomeDownloader {
    pub fn new(eutils: EutilsClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            eutils,
            output_dir: output_dir.into(),
            show_progress: true,
        }
    }

    /// Disable progress bars (tests, non-interactive runs)
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Find the first taxonomy hit for `query` that has a latest assembly
    pub async fn resolve_species(&self, query: &str) -> Result<Option<ResolvedSpecies>> {
        let term = taxonomy_term(query);
        info!("Resolving species name for query: {}", term);

        let taxids = self.eutils.esearch("taxonomy", &term, TAXONOMY_RETMAX).await?;
        if taxids.is_empty() {
            error!("No taxonomy match found for query: {}", term);
            return Ok(None);
        }

        for taxid in taxids {
            let assemblies = match self.eutils.esearch("assembly", &assembly_term(&taxid), 1).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Assembly search failed for TaxID {}: {}", taxid, e);
                    continue;
                },
            };
            let Some(assembly_uid) = assemblies.into_iter().next() else {
                continue;
            };

            let summary = match self.eutils.taxonomy_summary(&taxid).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Taxonomy summary failed for TaxID {}: {}", taxid, e);
                    None
                },
            };
            let scientific_name = summary
                .map(|s| s.scientific_name)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| term.clone());

            info!(
                "Resolved species with available assembly: {} (TaxID: {})",
                scientific_name, taxid
            );
            return Ok(Some(ResolvedSpecies {
                scientific_name,
                taxid,
                assembly_uid,
            }));
        }

        error!("No matching species with assemblies found for query: {}", term);
        Ok(None)
    }

    /// Download the latest assembly archives for one species query
    pub async fn download_genome(&self, query: &str) -> Result<DownloadOutcome> {
        let species_dir = self.output_dir.join(species_dir_name(query));
        if species_dir.is_dir() && holds_downloads(&species_dir)? {
            info!(
                "Species '{}' already downloaded in {}, skipping.",
                query,
                species_dir.display()
            );
            return Ok(DownloadOutcome::AlreadyPresent(species_dir));
        }

        let Some(resolved) = self.resolve_species(query).await? else {
            return Ok(DownloadOutcome::NoMatch);
        };
        info!("Assembly UID: {}", resolved.assembly_uid);

        let summary = self
            .eutils
            .assembly_summary(&resolved.assembly_uid)
            .await?
            .ok_or_else(|| PipelineError::NoAssemblyPath(resolved.assembly_uid.clone()))?;

        let Some(ftp_path) = summary.ftp_path() else {
            warn!("No FTP path found for assembly {}", summary.accession);
            return Ok(DownloadOutcome::NoAssemblyPath {
                accession: summary.accession.clone(),
            });
        };
        info!("Using assembly: {} ({})", summary.accession, summary.name);

        let base_url = format!("{}/", ftp_to_https(ftp_path).trim_end_matches('/'));
        let listing = self
            .eutils
            .http()
            .get(&base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let files = parse_listing(&listing)?;
        if files.is_empty() {
            warn!("No genomic or protein files found in {}", base_url);
            return Ok(DownloadOutcome::NoFiles { url: base_url });
        }
        info!("Found {} file(s) to download.", files.len());

        std::fs::create_dir_all(&species_dir)?;

        let mut downloaded = 0;
        let mut failed = 0;
        for name in &files {
            let url = format!("{base_url}{name}");
            let path = species_dir.join(name);
            match self.download_file(&url, &path).await {
                Ok(bytes) => {
                    info!("Saved to {} ({})", path.display(), progress::format_bytes(bytes));
                    downloaded += 1;
                },
                Err(e) => {
                    error!("Failed to download {}: {}", name, e);
                    failed += 1;
                },
            }
        }

        if downloaded == 0 {
            std::fs::remove_dir_all(&species_dir)?;
            error!("No archive could be downloaded for {}", query);
            return Ok(DownloadOutcome::AllFailed { failed });
        }

        Ok(DownloadOutcome::Downloaded {
            dir: species_dir,
            downloaded,
            failed,
        })
    }

    /// Download each query in turn; a failing species does not stop the rest
    pub async fn download_all(&self, queries: &[String]) -> Vec<(String, Option<DownloadOutcome>)> {
        let mut outcomes = Vec::with_capacity(queries.len());
        for query in queries {
            info!("Downloading genome assembly for {}...", query);
            let outcome = match self.download_genome(query).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("Failed to download genome assembly for {}: {}", query, e);
                    None
                },
            };
            outcomes.push((query.clone(), outcome));
        }

        let ok = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Some(DownloadOutcome::Downloaded { .. })))
            .count();
        info!("Downloaded assemblies for {} / {} species", ok, queries.len());
        outcomes
    }

    /// Stream `url` to `path`, returning the bytes written.
    ///
    /// Bytes land in `<path>.part`, renamed once the stream completes.
    async fn download_file(&self, url: &str, path: &Path) -> Result<u64> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        let result = self.stream_to(url, &partial).await;
        match result {
            Ok(written) => {
                std::fs::rename(&partial, path)?;
                Ok(written)
            },
            Err(e) => {
                if partial.exists() {
                    if let Err(rm) = std::fs::remove_file(&partial) {
                        warn!("Could not remove {}: {}", partial.display(), rm);
                    }
                }
                Err(e)
            },
        }
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.eutils.http().get(url).send().await?.error_for_status()?;

        let file_name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pb = progress::download_bar(
            response.content_length().unwrap_or(0),
            &format!("Downloading {file_name}"),
            self.show_progress,
        );

        let mut file = std::fs::File::create(path)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.flush()?;

        pb.finish_with_message(format!("Downloaded {file_name}"));
        Ok(written)
    }
}
