//! Command-line entry point for the electricity price pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use prices::{
    DEFAULT_EXPIRE_AFTER, DEFAULT_PROFILE_SAMPLE, EiaPipeline, SqliteCache,
    assert_required_columns, cache_path, check_state_codes, clear_cache, get_paths,
    profile_report, prune_cache, qa_report, read_table, write_profile_report,
};

#[derive(Parser)]
#[command(name = "dc-prices")]
#[command(author, version, about = "Fetch EIA electricity data and run data-quality checks")]
struct Cli {
    /// Directory to start the project-root search from
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every page of an EIA v2 route into data/raw/<out>.parquet
    Fetch {
        /// Route below the API base, e.g. electricity/retail-sales/data
        route: String,

        /// Query parameter as KEY=VALUE; repeat for multiple values
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output file stem (defaults to the route)
        #[arg(long)]
        out: Option<String>,
    },

    /// Load a CSV, validate it, and write QA artifacts to reports/qa
    Qa {
        /// CSV (or Parquet) file to check
        csv: PathBuf,

        /// Dataset name used in messages and artifact names
        #[arg(long)]
        name: Option<String>,

        /// Column that must be present; repeat for several
        #[arg(long = "require", value_name = "COLUMN")]
        required: Vec<String>,

        /// Column holding two-letter state codes to validate
        #[arg(long)]
        state_column: Option<String>,
    },

    /// Render an HTML profiling report
    Profile {
        /// CSV or Parquet file to profile
        file: PathBuf,

        /// Report title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,

        /// Maximum rows to profile; 0 profiles every row
        #[arg(long, default_value_t = DEFAULT_PROFILE_SAMPLE)]
        sample: usize,

        /// Output HTML path (defaults to reports/eda/<title>.html)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Maintain the HTTP response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove responses older than the given age
    Prune {
        /// Maximum age in hours (defaults to the session expiry)
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Remove every cached response
    Clear,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

fn route_stem(route: &str) -> String {
    route.trim_matches('/').replace(['/', '-'], "_")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.as_deref();

    match cli.command {
        Commands::Fetch { route, params, out } => {
            let pipeline = EiaPipeline::from_env(root)?;
            let stem = out.unwrap_or_else(|| route_stem(&route));
            let path = pipeline
                .fetch_to_parquet(&route, &params, &stem)
                .await
                .with_context(|| format!("Failed to fetch {route}"))?;
            println!("{}", path.display());
        }
        Commands::Qa {
            csv,
            name,
            required,
            state_column,
        } => {
            let paths = get_paths(root, true)?;
            let name = name.unwrap_or_else(|| file_stem(&csv));
            let df = read_table(&csv).with_context(|| format!("Failed to load {}", csv.display()))?;

            let required: Vec<&str> = required.iter().map(String::as_str).collect();
            assert_required_columns(&df, &required, &name)?;

            if let Some(column) = state_column {
                let Ok(series) = df.column(&column) else {
                    bail!("{name}: no column named {column:?}");
                };
                let bad = check_state_codes(series.as_materialized_series(), &name)?;
                if bad.is_empty() {
                    info!(column = %column, "All state codes are valid");
                }
            }

            let summary = qa_report(&paths, &df, &name)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Profile {
            file,
            title,
            sample,
            out,
        } => {
            let df =
                read_table(&file).with_context(|| format!("Failed to load {}", file.display()))?;
            let title = title.unwrap_or_else(|| file_stem(&file));
            let sample = (sample > 0).then_some(sample);

            let path = match out {
                Some(out) => {
                    write_profile_report(&df, &out, &title, sample)?;
                    out
                }
                None => profile_report(&get_paths(root, true)?, &df, &title, sample)?,
            };
            println!("{}", path.display());
        }
        Commands::Cache { action } => {
            let paths = get_paths(root, false)?;
            let cache = SqliteCache::new(cache_path(&paths))?;
            match action {
                CacheAction::Prune { max_age_hours } => {
                    let max_age = max_age_hours
                        .map_or(DEFAULT_EXPIRE_AFTER, |h| Duration::from_secs(h * 3600));
                    let removed = prune_cache(&cache, max_age).await?;
                    println!("{removed}");
                }
                CacheAction::Clear => clear_cache(&cache).await?,
            }
        }
    }

    Ok(())
}
