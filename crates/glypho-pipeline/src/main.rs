//! Glypho CLI - Main entry point

use clap::Parser;
use glypho_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use glypho_pipeline::commands;
use glypho_pipeline::commands::summarize::{DetectionSource, TaxaOutput};
use glypho_pipeline::uniprot::QueryFilter;
use glypho_pipeline::{Cli, Commands, PipelineConfig, PipelineError, PlotCommand};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Load .env before clap reads GLYPHO_CONFIG
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("glypho")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI still works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> glypho_pipeline::Result<()> {
    let Some(ref command) = cli.command else {
        return Err(PipelineError::config("a subcommand is required"));
    };
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match command {
        Commands::ExtractTopSpecies {
            input,
            species_output,
            metadata,
            prefix,
            top_n,
        } => commands::extract::run(input, species_output.as_deref(), metadata.as_deref(), prefix, *top_n),

        Commands::CombineOutputs { top_species, output } => {
            commands::uniprot::combine_outputs(&config, top_species, output).await
        },

        Commands::AddEcFromUniref {
            result_file,
            top_species,
            output,
            combined_output,
            max_workers,
            resolve_uniref90,
        } => {
            commands::uniprot::add_ec_from_uniref(
                &config,
                result_file.as_deref(),
                top_species.as_deref(),
                output,
                combined_output.as_deref(),
                *max_workers,
                *resolve_uniref90,
            )
            .await
        },

        Commands::DownloadTopTaxa {
            top_species,
            abundance,
            output_dir,
            top_n,
        } => {
            commands::download::download_top_taxa(
                &config,
                top_species.as_deref(),
                abundance.as_deref(),
                output_dir,
                *top_n,
            )
            .await
        },

        Commands::DownloadGenome { species, output_dir } => {
            commands::download::download_genome(&config, species, output_dir).await
        },

        Commands::RunProdigal { taxa_dir } => commands::prodigal::run(&config, taxa_dir).await,

        Commands::SearchUniprot {
            organism,
            ec,
            uniref90,
            output,
        } => {
            let filter = match (ec, uniref90) {
                (Some(ec), _) => QueryFilter::Ec(ec.clone()),
                (None, Some(cluster)) => QueryFilter::UniRef90(cluster.clone()),
                (None, None) => return Err(PipelineError::config("either --ec or --uniref90 is required")),
            };
            commands::uniprot::search(&config, organism, filter, output.as_deref()).await
        },

        Commands::Summarize {
            hits,
            deepec_dir,
            deepec_file,
            status,
            output,
            species_table,
            taxa_output,
            rank,
            threshold,
        } => {
            let source = match (hits, deepec_dir) {
                (Some(path), _) => DetectionSource::Hits(path),
                (None, Some(root)) => DetectionSource::DeepEc {
                    root,
                    file_name: deepec_file,
                },
                (None, None) => return Err(PipelineError::config("either --hits or --deepec-dir is required")),
            };
            let taxa = match (species_table, taxa_output) {
                (Some(species_table), Some(output)) => Some(TaxaOutput {
                    species_table,
                    output,
                    rank: *rank,
                    threshold: *threshold,
                }),
                _ => None,
            };
            commands::summarize::run(source, status, output, taxa)
        },

        Commands::Plot { command } => match command {
            PlotCommand::Composition {
                groups,
                species_table,
                rank,
                top_n,
                output,
            } => commands::plot::composition(groups, species_table, *rank, *top_n, output),
            PlotCommand::TaxaCompletion { input, output } => commands::plot::taxa_completion(input, output),
            PlotCommand::Venn {
                left,
                right,
                left_label,
                right_label,
                output,
            } => commands::plot::venn(left, right, (left_label.as_str(), right_label.as_str()), output),
        },
    }
}
