//! Galaxy generator
//!
//! Reads a table of tracks, projects their audio features into 3D and clusters them.
//!
//! **Usage:**
//! ```bash
//! track-galaxy [INPUT] [OUTPUT] [--config <file>] [--k <n>] [--seed <n>] [--pretty] [--verbose]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use galaxy::{Pipeline, PipelineConfig, PipelineEvent};
use std::path::PathBuf;
use tracing::{debug, info};

/// Music galaxy generator
#[derive(Parser, Debug)]
#[clap(name = "track-galaxy")]
#[clap(about = "Project music tracks into a clustered 3D galaxy (PCA + k-means)")]
struct Args {
    /// Delimited input file with one track per row
    #[clap(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Destination of the JSON document
    #[clap(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// TOML configuration file (command line values take precedence)
    #[clap(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Amount of clusters
    #[clap(long)]
    k: Option<usize>,

    /// Amount of projection dimensions
    #[clap(long)]
    dims: Option<usize>,

    /// Seed for sampling and centroid initialization
    #[clap(long)]
    seed: Option<u64>,

    /// Maximum size of the working set
    #[clap(long)]
    global_cap: Option<usize>,

    /// Maximum amount of tracks per release year
    #[clap(long)]
    per_group_cap: Option<usize>,

    /// Upper bound for k-means iterations
    #[clap(long)]
    max_iter: Option<usize>,

    /// k-means stops once the total squared centroid shift is at or below this value
    #[clap(long)]
    tolerance: Option<f64>,

    /// Amount of k-means runs with different initializations
    #[clap(long)]
    n_init: Option<usize>,

    /// Field delimiter of the input file
    #[clap(long)]
    delimiter: Option<char>,

    /// Indent the JSON output
    #[clap(long)]
    pretty: bool,

    /// Enable debug logging
    #[clap(long, short)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(input) = self.input { config.input_path = input; }
        if let Some(output) = self.output { config.output_path = output; }
        if let Some(k) = self.k { config.k = k; }
        if let Some(dims) = self.dims { config.dims = dims; }
        if let Some(seed) = self.seed { config.seed = seed; }
        if let Some(global_cap) = self.global_cap { config.global_cap = global_cap; }
        if let Some(per_group_cap) = self.per_group_cap { config.per_group_cap = per_group_cap; }
        if let Some(max_iter) = self.max_iter { config.max_iter = max_iter; }
        if let Some(tolerance) = self.tolerance { config.tolerance = tolerance; }
        if let Some(n_init) = self.n_init { config.n_init = n_init; }
        if let Some(delimiter) = self.delimiter { config.delimiter = delimiter; }
        config.pretty |= self.pretty;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = args.into_config()?;
    debug!(?config, "Configuration");

    let report = |event: &PipelineEvent| info!("{}", event);
    let pipeline = Pipeline::new(config).context("Invalid configuration")?.observer(&report);

    let written = pipeline.process_file().with_context(|| format!(
        "Failed to build galaxy from {}", pipeline.config().input_path.display()
    ))?;
    info!("Done ({} tracks)", written);
    Ok(())
}
