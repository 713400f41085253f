//! hitreduce CLI - per-event hit reduction of drift-chamber data.
//!
//! Reads JSON-lines events, runs the configured reduction stages and
//! writes the reduced events back out.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use hitreduce_algorithms::{summarize, EventReducer, ReductionConfig};
use hitreduce_core::{RunStatistics, Station};
use hitreduce_geom::{ChamberHodoLut, GeometryModel, LookupTableBuilder, LutConfig};
use hitreduce_io::{EventReader, EventWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    HitreduceIo(#[from] hitreduce_io::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] hitreduce_geom::Error),

    #[error("Reduction error: {0}")]
    Reduction(#[from] hitreduce_algorithms::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

/// Pipeline stage selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Dedup,
    Outoftime,
    Decluster,
    Hodomask,
    Sagitta,
}

/// Per-event hit reduction for drift-chamber and hodoscope data.
#[derive(Parser)]
#[command(name = "hitreduce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce a JSON-lines event file
    Reduce(ReduceArgs),

    /// Build the chamber-to-hodoscope lookup table
    Lut {
        /// Geometry table (TSV)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Reduction config whose `lut` section is used
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the table as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show the planes of a geometry table
    Geometry {
        /// Geometry table (TSV)
        geometry: PathBuf,
    },
}

#[derive(Args)]
struct ReduceArgs {
    /// Input event file (JSON lines)
    input: PathBuf,

    /// Output event file (JSON lines)
    #[arg(short, long)]
    output: PathBuf,

    /// Geometry table (TSV), required by hodomask and sagitta
    #[arg(short, long)]
    geometry: Option<PathBuf>,

    /// Reduction config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable a stage on top of the config
    #[arg(long, value_enum)]
    enable: Vec<StageArg>,

    /// Disable a stage on top of the config
    #[arg(long, value_enum)]
    disable: Vec<StageArg>,

    /// Center of the timing window
    #[arg(long)]
    tdc_center: Option<f64>,

    /// Full width of the timing window
    #[arg(long)]
    tdc_width: Option<f64>,

    /// Events reduced in parallel per batch
    #[arg(short, long, default_value = "256")]
    parallel: usize,

    /// Write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli.command) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Reduce(args) => reduce(args),
        Commands::Lut {
            geometry,
            config,
            json,
        } => {
            let geometry = GeometryModel::load(&geometry)?;
            let lut_config = match config {
                Some(path) => ReductionConfig::from_file(path)?.lut,
                None => LutConfig::default(),
            };
            let (lut, report) = LookupTableBuilder::new(lut_config).build_with_report(&geometry);

            println!("Chamber elements: {}", lut.len());
            println!("Associations: {}", lut.n_associations());
            if !report.is_clean() {
                println!("Missing hodoscope planes: {:?}", report.missing_hodo_planes);
                println!("Missing chamber planes: {:?}", report.missing_chamber_planes);
                println!("Unknown chamber planes: {:?}", report.unknown_chamber_planes);
                println!("Non-chamber associations: {:?}", report.invalid_chambers);
                println!("Empty projections: {}", report.empty_projections);
            }
            if let Some(path) = json {
                lut.write_json(BufWriter::new(File::create(&path)?))?;
                println!("Wrote {}", path.display());
            }
            Ok(())
        }
        Commands::Geometry { geometry } => {
            let geometry = GeometryModel::load(&geometry)?;
            println!(
                "{:>4} | {:<8} | {:<15} | {:>5} | {:>8} | {:>9}",
                "ID", "Name", "Type", "N", "Spacing", "z"
            );
            println!("{:-<64}", "");
            for plane in geometry.iter() {
                println!(
                    "{:>4} | {:<8} | {:<15} | {:>5} | {:>8.3} | {:>9.2}",
                    plane.detector_id(),
                    plane.name(),
                    format!("{:?}", plane.plane_type()),
                    plane.n_elements(),
                    plane.spacing(),
                    plane.z()
                );
            }
            Ok(())
        }
    }
}

fn reduce(args: ReduceArgs) -> Result<()> {
    if args.parallel == 0 {
        return Err(CliError::Usage("--parallel must be at least 1".to_string()));
    }

    let mut config = match &args.config {
        Some(path) => ReductionConfig::from_file(path)?,
        None => ReductionConfig::default(),
    };
    for &stage in &args.enable {
        set_stage(&mut config, stage, true);
    }
    for &stage in &args.disable {
        set_stage(&mut config, stage, false);
    }
    if let Some(center) = args.tdc_center {
        config.tdc_center = center;
    }
    if let Some(width) = args.tdc_width {
        config.tdc_width = width;
    }

    let geometry = args
        .geometry
        .as_ref()
        .map(GeometryModel::load)
        .transpose()?;
    let lut: Option<ChamberHodoLut> = match (&geometry, config.hodomask) {
        (Some(geometry), true) => {
            Some(LookupTableBuilder::new(config.lut.clone()).build(geometry))
        }
        _ => None,
    };
    let reducer = EventReducer::new(config, geometry.as_ref(), lut.as_ref())?;
    log::info!(
        "stages: {}",
        reducer
            .stages()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let start = Instant::now();
    let mut reader = EventReader::open(&args.input)?;
    let mut writer = EventWriter::create(&args.output)?;
    let mut run = RunStatistics::new();

    loop {
        let records = reader.read_batch(args.parallel)?;
        if records.is_empty() {
            break;
        }
        let views = records
            .iter()
            .map(|record| record.as_event())
            .collect::<hitreduce_io::Result<Vec<_>>>()?;
        let reductions = reducer.reduce_batch(&views);
        for (record, reduction) in records.iter().zip(&reductions) {
            writer.write_reduced(record, &reduction.kept)?;
        }
        run.merge(&summarize(&reductions));
    }
    writer.flush()?;

    print_summary(&run, start.elapsed().as_secs_f64());
    if let Some(path) = args.summary_json {
        serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &run)?;
        log::info!("wrote run summary to {}", path.display());
    }
    Ok(())
}

fn set_stage(config: &mut ReductionConfig, stage: StageArg, enabled: bool) {
    match stage {
        StageArg::Dedup => config.dedup = enabled,
        StageArg::Outoftime => config.outoftime = enabled,
        StageArg::Decluster => config.decluster = enabled,
        StageArg::Hodomask => config.hodomask = enabled,
        StageArg::Sagitta => config.sagitta = enabled,
    }
}

fn print_summary(run: &RunStatistics, seconds: f64) {
    println!(
        "Processed {} events in {:.2}s ({} rejected by occupancy)",
        run.events_processed, seconds, run.events_rejected
    );
    println!(
        "Hits: {} in, {} kept ({:.1}%)",
        run.hits_in,
        run.hits_kept,
        100.0 * run.retention().unwrap_or(0.0)
    );
    println!("Removed by stage:");
    println!("  dedup:     {}", run.removed.dedup);
    println!("  outoftime: {}", run.removed.out_of_time);
    println!("  decluster: {}", run.removed.decluster);
    println!("  hodomask:  {}", run.removed.hodo_mask);
    println!("  sagitta:   {}", run.removed.sagitta);
    println!("Clusters: {}", run.clusters_found);

    println!("{:<6} | {:>10} | {:>10} | {:>7}", "Station", "In", "Kept", "Kept %");
    for station in Station::ALL {
        let n_in = run.stations.hits_in(station);
        if n_in == 0 {
            continue;
        }
        println!(
            "{:<6} | {:>10} | {:>10} | {:>6.1}%",
            station.name(),
            n_in,
            run.stations.hits_kept(station),
            100.0 * run.stations.retention(station).unwrap_or(0.0)
        );
    }

    if !run.anomalies.is_empty() {
        println!("Anomalies:");
        println!("  missing geometry:       {}", run.anomalies.missing_geometry);
        println!("  unknown plane type:     {}", run.anomalies.unknown_plane_type);
        println!("  mixed detector cluster: {}", run.anomalies.mixed_detector_cluster);
        println!("  element out of range:   {}", run.anomalies.element_out_of_range);
    }
}
