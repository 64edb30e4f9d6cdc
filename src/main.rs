use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridmap::{
    config::{ConfigLoader, GridMapConfig},
    layer::LayerLoader,
    map::GridMap,
    observer::Observers,
    scheduler::FixedStep,
    snapshot::SnapshotWriter,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Weighted grid map layout runner")]
struct Cli {
    /// GeoJSON FeatureCollection with one feature per region
    #[arg(long)]
    input: PathBuf,

    /// Feature property holding each region's tile count
    #[arg(long)]
    weight_prop: Option<String>,

    /// YAML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final map frame as JSON here
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write a frame every N ticks (0 disables)
    #[arg(long, default_value_t = 0)]
    snapshot_interval: u64,

    /// Directory for tick snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Override the simulation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop relaxing after this many ticks even if not converged
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Serve the layout live over HTTP instead of running in batch
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new(".").load(path)?,
        None => GridMapConfig::default(),
    };
    if let Some(property) = &cli.weight_prop {
        config = config.with_weight_property(property.clone());
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    config.validate().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    let layer = LayerLoader::new(".").load(&cli.input)?;
    let name = cli
        .input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("gridmap")
        .to_string();
    let frame_interval = Duration::from_millis(config.snap.frame_ms);
    let hot = config.simulation.alpha_target > 0.0;
    let mut map = GridMap::build(&layer, config)
        .with_context(|| format!("Failed to build grid map from {}", cli.input.display()))?;

    if hot && cli.max_ticks.is_none() {
        bail!("alpha_target > 0 never converges; pass --max-ticks to bound the run");
    }

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new()?;
        return runtime.block_on(web::run(WebServerConfig {
            name,
            map,
            frame_interval,
            max_ticks: cli.max_ticks,
            host: cli.host,
            port: cli.port,
        }));
    }

    let mut relax = FixedStep::new(frame_interval);
    if let Some(limit) = cli.max_ticks {
        relax = relax.with_limit(limit);
    }

    let mut snapshots = SnapshotWriter::new(&cli.snapshot_dir, &name, cli.snapshot_interval);
    let outcome = map.layout(
        &mut relax,
        &mut FixedStep::new(frame_interval),
        &mut Observers::new().with(&mut snapshots),
    )?;
    let written = snapshots.finish()?;

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&map.frame(&name))?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write output {}", path.display()))?;
    }

    let grid = map.grid();
    println!(
        "Grid map '{}' laid out: {} tiles on a {}x{} grid (cell size {:.4}), {} steps, converged: {}, snapshots: {}",
        name,
        map.tiles().len(),
        grid.nx(),
        grid.ny(),
        grid.cell_size(),
        outcome.run.steps,
        outcome.run.converged,
        written.len()
    );
    let crowded = map.crowded_cells();
    if !crowded.is_empty() {
        println!("{} cells hold more than one tile", crowded.len());
    }
    Ok(())
}
