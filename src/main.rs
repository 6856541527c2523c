//! # Butterfly-network CLI
//!
//! Command-line interface for the butterfly-network library.
//! Builds routing network databases from OpenStreetMap PBF files.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use butterfly_network::{profiles, BuilderConfig, NetworkBuilder, PbfSource, RouterDb, Vehicle};
use clap::{Parser, Subcommand};
use log::error;

mod cli;

/// Command-line interface for butterfly-network
#[derive(Parser)]
#[command(name = "butterfly-network")]
#[command(about = "Builds Hilbert-sorted routing networks from OpenStreetMap data")]
#[command(long_about = "Builds a routing network database from an OpenStreetMap PBF file:
  butterfly-network build belgium.osm.pbf belgium.db                  # car network
  butterfly-network build belgium.osm.pbf belgium.db --vehicle bicycle --vehicle pedestrian
  butterfly-network build planet.osm.pbf planet.db --stages 4         # bound memory use
  butterfly-network info belgium.db                                   # show counts and profiles

Build options can also come from a JSON file (--config); flags override it.")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a network database from a PBF file
    Build {
        /// Input OpenStreetMap PBF file
        input: PathBuf,

        /// Output database file
        output: PathBuf,

        /// Vehicle to build for: car, bicycle or pedestrian (repeatable)
        #[arg(long = "vehicle", default_value = "car")]
        vehicles: Vec<String>,

        /// Minimum number of stages; more stages use less memory
        #[arg(long)]
        stages: Option<usize>,

        /// Make every node of a routable way a vertex
        #[arg(long)]
        all_core: bool,

        /// Hilbert depth for the final vertex sort
        #[arg(long, conflicts_with = "no_sort")]
        sort_depth: Option<u8>,

        /// Keep vertices in input order
        #[arg(long)]
        no_sort: bool,

        /// JSON file with builder options
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show counts, profiles and identity of a database
    Info {
        /// Database file
        db: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::from_default_env();
    logger.target(env_logger::Target::Stderr);
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Info);
    }
    logger.init();

    if cli.verbose {
        eprintln!("🦋 Butterfly-network v{} starting...", env!("BUTTERFLY_VERSION"));
    }

    match cli.command {
        Commands::Build {
            input,
            output,
            vehicles,
            stages,
            all_core,
            sort_depth,
            no_sort,
            config,
        } => {
            let mut config = match config {
                Some(path) => BuilderConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => BuilderConfig::default(),
            };
            if let Some(stages) = stages {
                config.minimum_stages = stages;
            }
            if all_core {
                config.all_core = true;
            }
            if sort_depth.is_some() {
                config.sort_depth = sort_depth;
            }
            if no_sort {
                config.sort_depth = None;
            }
            config.validate()?;

            build(&input, &output, &vehicles, config)
        }
        Commands::Info { db } => info(&db),
    }
}

fn resolve_vehicles(names: &[String]) -> Result<Vec<Box<dyn Vehicle>>> {
    let mut vehicles: Vec<Box<dyn Vehicle>> = Vec::with_capacity(names.len());
    for name in names {
        let vehicle = profiles::by_name(name).ok_or_else(|| {
            anyhow!("Unknown vehicle '{name}' (expected car, bicycle or pedestrian)")
        })?;
        if vehicles.iter().any(|v| v.name() == vehicle.name()) {
            continue;
        }
        vehicles.push(Box::new(vehicle));
    }
    Ok(vehicles)
}

fn build(input: &Path, output: &Path, vehicle_names: &[String], config: BuilderConfig) -> Result<()> {
    let vehicles = resolve_vehicles(vehicle_names)?;
    let names: Vec<&str> = vehicles.iter().map(|v| v.name()).collect();
    eprintln!("📂 Input: {}", input.display());
    eprintln!("🚗 Vehicles: {}", names.join(", "));

    let mut db = RouterDb::new(config.max_edge_distance);
    if let Some(name) = input.file_name() {
        db.meta_mut().add("source", name.to_string_lossy());
    }
    db.meta_mut()
        .add("builder", format!("butterfly-network {}", env!("BUTTERFLY_VERSION")));

    let progress = cli::ProgressManager::new(&format!("🦋 Building network from {}", input.display()));
    let mut builder = NetworkBuilder::new(config, vehicles);
    builder.on_progress(progress.callback());

    let mut source = PbfSource::new(input);
    let stats = builder
        .build(&mut source, &mut db)
        .with_context(|| format!("Failed to build network from {}", input.display()))?;
    progress.finish();

    eprintln!(
        "  ✓ {} ways in {} stage(s): {} vertices, {} edges",
        stats.ways_added, stats.stages, stats.vertices, stats.edges
    );
    if stats.ways_incomplete > 0 || stats.ways_rejected > 0 {
        eprintln!(
            "  ⚠️  Skipped {} incomplete and {} rejected ways",
            stats.ways_incomplete, stats.ways_rejected
        );
    }

    let size = db
        .write_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!("📁 Saved to: {} ({} bytes)", output.display(), size);
    eprintln!("✅ Done!");
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let db = RouterDb::read_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let network = db.network();

    println!("🦋 {}", path.display());
    println!("  guid:            {}", db.guid());
    println!("  vertices:        {}", network.vertex_count());
    println!("  edges:           {}", network.edge_count());
    println!("  max edge length: {} m", network.max_edge_distance());
    match network.vertices().sorted_depth() {
        Some(depth) => println!("  hilbert depth:   {}", depth),
        None => println!("  hilbert depth:   unsorted"),
    }
    println!("  edge profiles:   {}", db.edge_profiles().count());
    println!("  edge meta:       {}", db.edge_meta().count());
    println!("  profiles:        {}", db.supported_profiles().join(", "));

    let contracted: Vec<&str> = db.contracted_profiles().collect();
    if !contracted.is_empty() {
        println!("  contracted:      {}", contracted.join(", "));
    }
    for (key, value) in db.meta().iter() {
        println!("  {key}: {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_vehicles() {
        let names = vec!["car".to_string(), "bike".to_string(), "bicycle".to_string()];
        let vehicles = resolve_vehicles(&names).unwrap();
        let names: Vec<&str> = vehicles.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["car", "bicycle"]);

        assert!(resolve_vehicles(&["tram".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "butterfly-network",
            "build",
            "in.osm.pbf",
            "out.db",
            "--vehicle",
            "car",
            "--vehicle",
            "pedestrian",
            "--stages",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Build {
                vehicles, stages, ..
            } => {
                assert_eq!(vehicles, vec!["car", "pedestrian"]);
                assert_eq!(stages, Some(2));
            }
            Commands::Info { .. } => panic!("expected build"),
        }

        let cli = Cli::try_parse_from(["butterfly-network", "build", "in.osm.pbf", "out.db"]).unwrap();
        match cli.command {
            Commands::Build { vehicles, .. } => assert_eq!(vehicles, vec!["car"]),
            Commands::Info { .. } => panic!("expected build"),
        }

        assert!(Cli::try_parse_from([
            "butterfly-network",
            "build",
            "a",
            "b",
            "--sort-depth",
            "12",
            "--no-sort"
        ])
        .is_err());
    }
}
