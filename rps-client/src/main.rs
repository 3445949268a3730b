use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rps_client::{load_settings, Driver, RunOptions};
use rps_core::BoundaryMode;
use rps_shared::SpawnRequest;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless rock-paper-scissors flocking simulation", long_about = None)]
struct Args {
    /// JSON settings file; missing fields use the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of randomly placed agents
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// World width
    #[arg(long)]
    width: Option<f32>,

    /// World height
    #[arg(long)]
    height: Option<f32>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Start with edge repulsion instead of wrap-around
    #[arg(long)]
    repel: bool,

    /// Toggle the boundary mode every N ticks
    #[arg(long)]
    toggle_every: Option<u64>,

    /// Spawn an agent before the first tick, as `x,y,kind` (kind: rock/paper/scissors or 1/2/3)
    #[arg(short, long)]
    spawn: Vec<SpawnRequest>,

    /// Log population counts every N ticks (0 disables)
    #[arg(short, long, default_value_t = 100)]
    report_every: u64,

    /// Stop as soon as a single kind remains
    #[arg(long)]
    stop_on_winner: bool,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(count) = args.count {
        settings.agent_count = count;
    }
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if args.repel {
        settings.boundary = BoundaryMode::Repel;
    }
    settings
        .validate()
        .context("Invalid settings after applying command line overrides")?;

    log::info!("World: {}x{}", settings.width, settings.height);
    log::info!("Agents: {}", settings.agent_count);

    let options = RunOptions {
        ticks: args.ticks,
        report_every: args.report_every,
        toggle_every: args.toggle_every,
        stop_on_winner: args.stop_on_winner,
        spawns: args.spawn,
    };

    let mut driver = Driver::from_settings(&settings, options);
    let summary = driver.run();

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
        println!("{}", json);
    } else {
        log::info!("Finished after {} ticks: {}", summary.ticks_run, summary.stats);
    }

    Ok(())
}
