//! hive CLI
//!
//! Splits recorded events into causally connected sub-events and removes
//! isolated hits.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand};

use hive_algorithms::{
    process_events, CleaningConfig, HiveCleaning, HiveSplitter, SplitterConfig,
    SPEED_OF_LIGHT_VACUUM,
};
use hive_core::geometry::{DetectorGeometry, GridLayout, Population};
use hive_core::hit::{Hit, HitSeries, SensorKey};
use hive_io::{read_events, read_geometry, EventRecord, HiveConfig, SubEventWriter};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    HiveIo(#[from] hive_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] hive_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Causal sub-event splitter and hit cleaner.
#[derive(Parser)]
#[command(name = "hive")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Worker threads (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Inputs shared by the processing commands.
#[derive(Args)]
struct ProcessArgs {
    /// Detector geometry (JSON)
    #[arg(short, long)]
    geometry: PathBuf,

    /// Recorded events (JSON)
    #[arg(short, long)]
    events: PathBuf,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (.json or .csv)
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Split events into causally connected sub-events
    Split {
        #[command(flatten)]
        args: ProcessArgs,

        /// Clean isolated hits before splitting
        #[arg(long)]
        clean: bool,
    },

    /// Remove isolated hits from events
    Clean {
        #[command(flatten)]
        args: ProcessArgs,
    },

    /// Show geometry and connectivity statistics
    Info {
        /// Detector geometry (JSON)
        geometry: PathBuf,

        /// Engine configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Benchmark splitting and cleaning on a synthetic detector
    Benchmark {
        /// Rings of strings around the centre string
        #[arg(long, default_value = "4")]
        rings: u32,

        /// Number of synthetic events
        #[arg(long, default_value = "200")]
        events: usize,

        /// Noise hits per event
        #[arg(long, default_value = "100")]
        noise: usize,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> Result<HiveConfig> {
    match path {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Ok(HiveConfig::from_file(path)?)
        }
        None => Ok(HiveConfig::default()),
    }
}

fn load_inputs(args: &ProcessArgs) -> Result<(Arc<DetectorGeometry>, Vec<EventRecord>, HiveConfig)> {
    let config = load_config(args.config.as_deref())?;
    let geometry = Arc::new(read_geometry(&args.geometry)?);
    let events = read_events(&args.events)?;
    Ok((geometry, events, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Split { args, clean } => {
            let (geometry, events, config) = load_inputs(&args)?;
            let start = Instant::now();

            let splitter = HiveSplitter::new(config.splitter, Arc::clone(&geometry))?;
            let series: Vec<HitSeries> = events.iter().map(EventRecord::hits).collect();
            let total_hits: usize = series.iter().map(HitSeries::len).sum();

            let split = if clean {
                let cleaning = HiveCleaning::new(config.cleaning, geometry)?;
                let (split, stats) = process_events(&series, Some(&cleaning), &splitter);
                info!(
                    "cleaning kept {} of {} hits",
                    stats.cleaning.hits_kept, stats.cleaning.hits_processed
                );
                split
            } else {
                let (split, stats) = splitter.split_events_with_statistics(&series);
                info!(
                    "{} components, {} hits below multiplicity",
                    stats.components_found, stats.hits_dropped
                );
                split
            };

            let mut writer = SubEventWriter::create(&args.output)?;
            for (record, sub_events) in events.iter().zip(&split) {
                writer.write_split(record.id, sub_events)?;
            }
            let written = writer.rows();
            writer.finish()?;

            let sub_events: usize = split.iter().map(Vec::len).sum();
            println!(
                "Split {} events in {:.2}s",
                events.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Total hits: {}", total_hits);
            println!("Sub-events: {}", sub_events);
            println!("Hits written: {} -> {}", written, args.output.display());
        }

        Commands::Clean { args } => {
            let (geometry, events, config) = load_inputs(&args)?;
            let start = Instant::now();

            let cleaning = HiveCleaning::new(config.cleaning, geometry)?;
            let series: Vec<HitSeries> = events.iter().map(EventRecord::hits).collect();
            let cleaned = cleaning.clean_events(&series);

            let mut writer = SubEventWriter::create(&args.output)?;
            for (record, hits) in events.iter().zip(&cleaned) {
                writer.write_cleaned(record.id, hits)?;
            }
            let kept = writer.rows();
            writer.finish()?;

            let total_hits: usize = series.iter().map(HitSeries::len).sum();
            println!(
                "Cleaned {} events in {:.2}s",
                events.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Hits kept: {} of {}", kept, total_hits);
            println!("Output: {}", args.output.display());
        }

        Commands::Info { geometry, config } => {
            let config = load_config(config.as_deref())?;
            let geometry = Arc::new(read_geometry(&geometry)?);

            let count = |population: Population| {
                (0..geometry.len())
                    .filter(|&i| geometry.population(i) == population)
                    .count()
            };
            println!("Sensors: {}", geometry.len());
            println!("Strings: {}", geometry.string_count());
            println!(
                "Populations: {} standard, {} dense, {} surface",
                count(Population::Standard),
                count(Population::Dense),
                count(Population::Surface)
            );

            let splitter = HiveSplitter::new(config.splitter, Arc::clone(&geometry))?;
            let stats = splitter.map().statistics();
            println!("Light-connected pairs: {}", stats.light_pairs);
            println!("Vicinity pairs: {}", stats.vicinity_pairs);
            if let Some(d) = splitter.map().max_light_distance() {
                println!("Max light distance: {:.1} m", d);
            }
            println!("Sweep horizon: {:.1} ns", splitter.horizon());

            let cleaning = HiveCleaning::new(config.cleaning, geometry)?;
            println!(
                "Cleaning vicinity pairs: {}",
                cleaning.map().statistics().vicinity_pairs
            );
        }

        Commands::Benchmark {
            rings,
            events,
            noise,
            iterations,
        } => {
            let geometry = Arc::new(GridLayout::hexagonal(rings).build()?);
            let build = Instant::now();
            let splitter = HiveSplitter::new(SplitterConfig::default(), Arc::clone(&geometry))?;
            let cleaning = HiveCleaning::new(CleaningConfig::default(), Arc::clone(&geometry))?;
            println!(
                "Built vicinity maps for {} sensors in {:.2}s",
                geometry.len(),
                build.elapsed().as_secs_f64()
            );

            let series = synthetic_events(&geometry, events, noise);
            let total_hits: usize = series.iter().map(HitSeries::len).sum();
            println!(
                "Benchmarking with {} events, {} hits, {} iterations",
                series.len(),
                total_hits,
                iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15}",
                "Engine", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<65}", "");

            let run = |name: &str, work: &dyn Fn() -> usize| {
                // Warmup
                let produced = work();
                debug!("{} warmup produced {}", name, produced);

                let times: Vec<f64> = (0..iterations.max(1))
                    .map(|_| {
                        let start = Instant::now();
                        let _ = work();
                        start.elapsed().as_secs_f64() * 1000.0
                    })
                    .collect();
                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;
                println!(
                    "{:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                    name, mean_time, min_time, max_time
                );
            };

            run("Split", &|| {
                splitter
                    .split_events(&series)
                    .iter()
                    .map(Vec::len)
                    .sum()
            });
            run("Clean", &|| {
                cleaning
                    .clean_events(&series)
                    .iter()
                    .map(HitSeries::len)
                    .sum()
            });
        }
    }

    Ok(())
}

/// Deterministic events: a straight light-speed track along the top layer
/// plus scattered noise hits.
fn synthetic_events(geometry: &DetectorGeometry, events: usize, noise: usize) -> Vec<HitSeries> {
    let sensors: Vec<(SensorKey, _)> = geometry.sensors().collect();
    if sensors.is_empty() {
        return Vec::new();
    }
    let n = sensors.len();

    (0..events)
        .map(|e| {
            let t0 = e as f64 * 50.0;
            let mut hits: Vec<Hit> = sensors
                .iter()
                .filter(|(key, _)| key.module == 10)
                .map(|&(key, position)| {
                    let t = t0 + position.x.abs() / SPEED_OF_LIGHT_VACUUM;
                    Hit::new(key, t, 1.0)
                })
                .collect();
            for i in 0..noise {
                let pick = (e * 7919 + i * 104_729) % n;
                let jitter = ((e * 31).wrapping_add(i.wrapping_mul(2_654_435_761)) % 20_000) as f64;
                hits.push(Hit::new(sensors[pick].0, t0 + jitter, 0.25));
            }
            HitSeries::from_hits(hits)
        })
        .collect()
}
