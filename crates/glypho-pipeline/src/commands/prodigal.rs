//! `glypho run-prodigal` command implementation

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::prodigal::{self, ProdigalRunner};
use std::path::Path;
use tracing::info;

/// Predict proteins for every species directory under `taxa_dir`
pub async fn run(config: &PipelineConfig, taxa_dir: &Path) -> Result<()> {
    let runner = ProdigalRunner::new(&config.prodigal);
    let taxa_dir = taxa_dir.to_path_buf();

    let summary = tokio::task::spawn_blocking(move || prodigal::run_all(&runner, &taxa_dir, true))
        .await
        .map_err(|e| PipelineError::Other(e.into()))??;

    info!(
        "Protein prediction: {} predicted, {} skipped, {} without genome, {} failed",
        summary.predicted, summary.skipped, summary.no_genome, summary.failed
    );
    Ok(())
}
