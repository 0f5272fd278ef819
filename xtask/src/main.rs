//! Build automation tasks for glypho
//!
//! - `generate-cli-docs`: render the `glypho` CLI reference from the clap
//!   definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for glypho", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &std::path::Path) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<glypho_pipeline::Cli>();

    let content = format!(
        r#"# glypho CLI Reference

Generated from the CLI source code on {}.

## Pipeline

```bash
# Species-level abundance and top species per sample status
glypho extract-top-species -i profile.tsv -m metadata.tsv -s species.tsv -p top_species -n 100

# Pathway enzymes per species, then hits reached through UniRef90 clusters
glypho combine-outputs -t top_species_all.tsv -o uniprot_hits.tsv
glypho add-ec-from-uniref -r uniprot_hits.tsv -o uniref_hits.tsv --max-workers 8

# Genomes and predicted proteins
glypho download-top-taxa -t top_species_all.tsv -o data/downloads
glypho run-prodigal data/downloads

# Completeness and charts
glypho summarize --hits uniref_hits.tsv -o summary.tsv --species-table species.tsv --taxa-output genus.tsv
glypho plot taxa-completion -i genus.tsv -o genus.svg
```

## Commands

{}

## Environment Variables

- `GLYPHO_CONFIG` - Pipeline configuration file (TOML)
- `GLYPHO_UNIPROT_URL`, `GLYPHO_UNIPROT_PAGE_SIZE`, `GLYPHO_UNIPROT_MAX_PAGES` - UniProt REST settings
- `GLYPHO_EUTILS_URL`, `GLYPHO_NCBI_DELAY_MS`, `NCBI_API_KEY`, `NCBI_EMAIL` - NCBI E-utilities settings
- `GLYPHO_HTTP_TIMEOUT_SECS` - HTTP timeout for both services
- `GLYPHO_PRODIGAL_BIN`, `GLYPHO_PRODIGAL_MODE` - Gene predictor invocation
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`, `LOG_FILTER`, `LOG_INCLUDE_LOCATION` - Logging

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    fs::create_dir_all(output_dir)?;
    let file_path = output_dir.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
