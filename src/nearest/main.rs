//! Nearest-candidate matching for point files.
//!
//! Reads a query file (e.g. buildings) and a candidate file (e.g. transit
//! stops), finds the closest candidate(s) for every query point by
//! great-circle distance, and writes the joined rows.

mod config;
mod output;
mod records;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nearest_stop::join::attach_nearest;
use nearest_stop::{IndexKind, NearestMatcher, Neighbors};

use crate::config::Config;
use crate::output::{write_rows, OutputFormat, OutputRow};
use crate::records::{load_points, to_point_set, PointRecord};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "nearest")]
#[command(about = "Match every query point to its closest candidate point")]
struct Args {
    /// Query points file (CSV, optionally .gz)
    #[arg(short, long)]
    query: PathBuf,

    /// Candidate points file (CSV, optionally .gz)
    #[arg(short, long)]
    candidates: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Number of nearest candidates per query point
    #[arg(short, long, default_value = "1")]
    k: usize,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index structure: ball_tree, sphere_tree or brute_force
    #[arg(long)]
    index: Option<IndexKind>,

    /// Reject out-of-range coordinates instead of matching them
    #[arg(long)]
    strict: bool,

    /// Run queries on a single thread
    #[arg(long)]
    no_parallel: bool,

    /// Id column name
    #[arg(long)]
    id_column: Option<String>,

    /// Longitude column name
    #[arg(long)]
    lon_column: Option<String>,

    /// Latitude column name
    #[arg(long)]
    lat_column: Option<String>,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout may carry the results
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;

    info!("Nearest-candidate matching");
    info!("Query: {}", args.query.display());
    info!("Candidates: {}", args.candidates.display());

    let queries = load_points(&args.query, &config.columns)?;
    let candidates = load_points(&args.candidates, &config.columns)?;

    let start = Instant::now();
    let matcher = NearestMatcher::new(&to_point_set(&candidates), config.matcher.clone())
        .context("Failed to build candidate index")?;
    info!(
        "Index ({}) over {} candidates built in {:?}",
        matcher.index_kind(),
        matcher.len(),
        start.elapsed()
    );

    let query_points = to_point_set(&queries);
    let start = Instant::now();

    let rows: Vec<OutputRow<'_>> = if args.k == 1 {
        let results = matcher.match_points(&query_points, true)?;
        attach_nearest(&queries, &candidates, &results)?
            .iter()
            .map(OutputRow::from_joined)
            .collect()
    } else {
        let neighbors = matcher.k_nearest(&query_points, args.k)?;
        ranked_rows(&queries, &candidates, &neighbors, config.matcher.earth_radius_m)
    };

    info!(
        "Matched {} query points in {:?}",
        queries.len(),
        start.elapsed()
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_rows(BufWriter::new(file), &rows, args.format)?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => write_rows(io::stdout().lock(), &rows, args.format)?,
    }

    Ok(())
}

/// One row per (query, neighbor), ranked from 1 within each query.
fn ranked_rows<'a>(
    queries: &'a [PointRecord],
    candidates: &'a [PointRecord],
    neighbors: &Neighbors,
    radius: f64,
) -> Vec<OutputRow<'a>> {
    queries
        .iter()
        .zip(neighbors.rows())
        .flat_map(|(query, (distances, indices))| {
            indices
                .iter()
                .zip(distances)
                .enumerate()
                .map(move |(rank, (&idx, &d))| {
                    OutputRow::new(query, &candidates[idx], rank + 1, d * radius)
                })
        })
        .collect()
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if let Some(index) = args.index {
        config.matcher.index = index;
    }
    if args.strict {
        config.matcher.validate_coordinates = true;
    }
    if args.no_parallel {
        config.matcher.parallel = false;
    }
    if let Some(id) = &args.id_column {
        config.columns.id = id.clone();
    }
    if let Some(lon) = &args.lon_column {
        config.columns.lon = lon.clone();
    }
    if let Some(lat) = &args.lat_column {
        config.columns.lat = lat.clone();
    }
    if let Some(delimiter) = args.delimiter {
        config.columns.delimiter = delimiter;
    }

    Ok(config)
}
