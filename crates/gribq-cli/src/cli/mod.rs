//! CLI for gribq.

mod commands;
mod resolve;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gribq_core::config::{self, GribqConfig};
use gribq_core::model::ModelRegistry;
use std::path::PathBuf;

use commands::{run_configure, run_fetch, run_mask, run_plan, run_presets};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gribq")]
#[command(
    about = "gribq: fetch NOAA GRIB subsets for an area, falling back to older model runs",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// What to ask for: model, product, presets, area and lead time.
#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    /// Preset to fetch (repeatable). Defaults to `preset` from the config.
    #[arg(short, long = "preset", value_name = "NAME")]
    pub presets: Vec<String>,

    /// Model name (default from config, usually "gfs").
    #[arg(long)]
    pub model: Option<String>,

    /// Product of the model, e.g. gfs_0p25.
    #[arg(long)]
    pub product: Option<String>,

    /// Center latitude in degrees.
    #[arg(long, allow_hyphen_values = true, conflicts_with = "bounds")]
    pub lat: Option<f64>,

    /// Center longitude in degrees.
    #[arg(long, allow_hyphen_values = true, conflicts_with = "bounds")]
    pub lon: Option<f64>,

    /// Box height in degrees of latitude.
    #[arg(long, conflicts_with = "bounds")]
    pub height: Option<f64>,

    /// Box width in degrees of longitude.
    #[arg(long, conflicts_with = "bounds")]
    pub width: Option<f64>,

    /// Explicit box instead of center and size.
    #[arg(
        long,
        value_name = "LAT_MIN,LAT_MAX,LON_MIN,LON_MAX",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub bounds: Option<Vec<f64>>,

    /// Forecast hour (lead time) within the run.
    #[arg(short = 'f', long)]
    pub forecast_hour: Option<u32>,

    /// Resolve cycles as if it were this time (RFC 3339), instead of now.
    #[arg(long, value_name = "TIME")]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Variables,
    Levels,
}

#[derive(Debug, Subcommand)]
pub enum MaskCommand {
    /// Print the hex mask selecting the given ids.
    Encode {
        #[arg(long)]
        model: Option<String>,
        /// Which reference list the ids belong to.
        #[arg(long, value_enum)]
        list: ListKind,
        /// Ids to select.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the ids selected by a hex mask, in list order.
    Decode {
        #[arg(long)]
        model: Option<String>,
        #[arg(long, value_enum)]
        list: ListKind,
        /// Mask such as 0x2100000800000800000.
        mask: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch the newest available run for each preset and store it.
    Fetch {
        #[command(flatten)]
        query: QueryArgs,
        /// Root directory for run folders (default from config).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Fetch even when --new-only would skip.
        #[arg(long)]
        force: bool,
        /// Skip presets whose newest-cycle file already exists.
        #[arg(long)]
        new_only: bool,
        /// Only report whether the newest-cycle files exist locally.
        #[arg(long, conflicts_with_all = ["force", "new_only"])]
        check_only: bool,
        /// Run up to N preset sessions concurrently.
        #[arg(long, default_value = "1", value_name = "N")]
        jobs: usize,
    },

    /// Print the candidate URLs that fetch would try, without network I/O.
    Plan {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List the presets of a model with their decoded selections.
    Presets {
        #[arg(long)]
        model: Option<String>,
    },

    /// Convert between id lists and hex masks.
    Mask {
        #[command(subcommand)]
        action: MaskCommand,
    },

    /// Show the configuration, or persist settings into it.
    Configure {
        /// Directory for downloaded runs.
        #[arg(long, value_name = "PATH")]
        storage: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                query,
                output_dir,
                force,
                new_only,
                check_only,
                jobs,
            } => {
                let opts = commands::FetchOptions {
                    output_dir,
                    force,
                    new_only,
                    check_only,
                    jobs,
                };
                run_fetch(&cfg, &registry(&cfg)?, &query, opts).await?
            }
            CliCommand::Plan { query } => run_plan(&cfg, &registry(&cfg)?, &query)?,
            CliCommand::Presets { model } => {
                run_presets(&registry(&cfg)?, model.as_deref().unwrap_or(&cfg.model))?
            }
            CliCommand::Mask { action } => run_mask(&cfg, &registry(&cfg)?, &action)?,
            CliCommand::Configure { storage } => run_configure(&mut cfg, storage.as_deref())?,
        }

        Ok(())
    }
}

/// Built-in models plus the config's `model_files`.
fn registry(cfg: &GribqConfig) -> Result<ModelRegistry> {
    ModelRegistry::with_files(&cfg.model_files)
}

#[cfg(test)]
mod tests;
