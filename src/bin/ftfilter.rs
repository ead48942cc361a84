//! ftfilter - Feature table and sequence filtering CLI
//!
//! Command-line interface for metadata-driven filtering of feature tables
//! and representative sequences.

use clap::{Parser, Subcommand};
use feature_table_filter::data::{FeatureTable, Metadata, SequenceSet};
use feature_table_filter::error::Result;
use feature_table_filter::filter::{filter_samples_with_stats, filter_seqs_with_stats, SampleFilter};
use feature_table_filter::pipeline::{Pipeline, PipelineConfig};
use feature_table_filter::summary::summarize_table;
use std::path::PathBuf;

/// Metadata-driven feature table and sequence filtering
#[derive(Parser)]
#[command(name = "ftfilter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a feature table's samples
    FilterSamples {
        /// Path to feature table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output path for the filtered table TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum total sample frequency
        #[arg(long, default_value = "0")]
        min_frequency: f64,

        /// Maximum total sample frequency
        #[arg(long)]
        max_frequency: Option<f64>,

        /// Minimum observed feature count per sample
        #[arg(long, default_value = "0")]
        min_features: usize,

        /// Maximum observed feature count per sample
        #[arg(long)]
        max_features: Option<usize>,

        /// Metadata predicate, e.g. "body_site=gut" or "body_site!=gut"
        #[arg(long = "where")]
        where_clause: Option<String>,

        /// Remove (rather than retain) the samples named in the metadata
        #[arg(long)]
        exclude_ids: bool,

        /// Keep features left without any non-zero values
        #[arg(long)]
        keep_empty_features: bool,

        /// Print filter statistics as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Filter representative sequences down to a table's features
    FilterSeqs {
        /// Path to representative sequences FASTA
        #[arg(short, long)]
        seqs: PathBuf,

        /// Path to the (already filtered) feature table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Output path for the filtered FASTA
        #[arg(short, long)]
        output: PathBuf,

        /// Print filter statistics as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a filtering pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(long)]
        config: PathBuf,

        /// Path to feature table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Path to representative sequences FASTA
        #[arg(short, long)]
        seqs: PathBuf,

        /// Output path for the filtered table TSV
        #[arg(long)]
        output_table: PathBuf,

        /// Output path for the filtered FASTA
        #[arg(long)]
        output_seqs: PathBuf,
    },

    /// Summarize a feature table
    Summarize {
        /// Path to feature table TSV
        #[arg(short, long)]
        table: PathBuf,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::FilterSamples {
            table,
            metadata,
            output,
            min_frequency,
            max_frequency,
            min_features,
            max_features,
            where_clause,
            exclude_ids,
            keep_empty_features,
            json,
        } => cmd_filter_samples(
            &table,
            metadata.as_ref(),
            &output,
            SampleFilter {
                min_frequency,
                max_frequency,
                min_features,
                max_features,
                where_clause,
                exclude_ids,
                filter_empty_features: !keep_empty_features,
            },
            json,
        ),

        Commands::FilterSeqs {
            seqs,
            table,
            output,
            json,
        } => cmd_filter_seqs(&seqs, &table, &output, json),

        Commands::Run {
            config,
            table,
            metadata,
            seqs,
            output_table,
            output_seqs,
        } => cmd_run(&config, &table, &metadata, &seqs, &output_table, &output_seqs),

        Commands::Summarize { table, format } => cmd_summarize(&table, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Filter a table's samples by metadata and threshold criteria
fn cmd_filter_samples(
    table_path: &PathBuf,
    metadata_path: Option<&PathBuf>,
    output_path: &PathBuf,
    filter: SampleFilter,
    json: bool,
) -> Result<()> {
    eprintln!("Loading feature table...");
    let table = FeatureTable::from_tsv(table_path)?;
    eprintln!(
        "Loaded {} features x {} samples",
        table.n_features(),
        table.n_samples()
    );

    let metadata = match metadata_path {
        Some(path) => Some(Metadata::from_tsv(path)?),
        None => None,
    };

    let (filtered, stats) = filter_samples_with_stats(&table, metadata.as_ref(), &filter)?;

    eprintln!("Writing filtered table to {:?}...", output_path);
    filtered.to_tsv(output_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", stats);
    }
    Ok(())
}

/// Filter sequences down to a table's features
fn cmd_filter_seqs(
    seqs_path: &PathBuf,
    table_path: &PathBuf,
    output_path: &PathBuf,
    json: bool,
) -> Result<()> {
    eprintln!("Loading sequences and table...");
    let seqs = SequenceSet::from_fasta(seqs_path)?;
    let table = FeatureTable::from_tsv(table_path)?;

    let (filtered, stats) = filter_seqs_with_stats(&seqs, &table)?;

    eprintln!("Writing filtered sequences to {:?}...", output_path);
    filtered.to_fasta(output_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", stats);
    }
    Ok(())
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &PathBuf,
    table_path: &PathBuf,
    metadata_path: &PathBuf,
    seqs_path: &PathBuf,
    output_table: &PathBuf,
    output_seqs: &PathBuf,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    eprintln!("Loading data...");
    let table = FeatureTable::from_tsv(table_path)?;
    let metadata = Metadata::from_tsv(metadata_path)?;
    let seqs = SequenceSet::from_fasta(seqs_path)?;

    eprintln!(
        "Loaded {} features x {} samples, {} sequences",
        table.n_features(),
        table.n_samples(),
        seqs.len()
    );

    eprintln!("Running pipeline '{}'...", config.name);
    let pipeline = Pipeline::from_config(&config);
    let (filtered_table, filtered_seqs) = pipeline.run(&table, &metadata, &seqs)?;

    eprintln!("Writing filtered table to {:?}...", output_table);
    filtered_table.to_tsv(output_table)?;
    eprintln!("Writing filtered sequences to {:?}...", output_seqs);
    filtered_seqs.to_fasta(output_seqs)?;

    eprintln!(
        "Done! {} samples, {} features, {} sequences retained",
        filtered_table.n_samples(),
        filtered_table.n_features(),
        filtered_seqs.len()
    );
    Ok(())
}

/// Summarize a feature table
fn cmd_summarize(table_path: &PathBuf, format: &str) -> Result<()> {
    eprintln!("Loading feature table...");
    let table = FeatureTable::from_tsv(table_path)?;

    let summary = summarize_table(&table);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "yaml" => println!("{}", serde_yaml::to_string(&summary)?),
        _ => println!("{}", summary),
    }
    Ok(())
}
