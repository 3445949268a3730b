//! Headless driver for the rock-paper-scissors flock.
//!
//! Stands in for the rendering/input collaborator: it owns the engine, issues
//! spawn and boundary commands between ticks and reads the population back
//! once per tick.

use std::path::Path;

use anyhow::{Context, Result};
use rps_core::{BoundaryMode, Engine};
use rps_shared::{PopulationStats, SimulationSettings, SpawnRequest};
use serde::Serialize;

/// Reads settings from a JSON file, or returns the defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<SimulationSettings> {
    let Some(path) = path else {
        return Ok(SimulationSettings::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings = SimulationSettings::from_json(&json)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;

    log::info!("Loaded settings from {}", path.display());
    Ok(settings)
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: u64,
    /// Log population stats every this many ticks (0 disables).
    pub report_every: u64,
    pub toggle_every: Option<u64>,
    pub stop_on_winner: bool,
    /// Applied once, before the first tick.
    pub spawns: Vec<SpawnRequest>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 1000,
            report_every: 100,
            toggle_every: None,
            stop_on_winner: false,
            spawns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub ticks_run: u64,
    pub boundary: BoundaryMode,
    pub stats: PopulationStats,
}

pub struct Driver {
    engine: Engine,
    options: RunOptions,
}

impl Driver {
    pub fn new(engine: Engine, options: RunOptions) -> Self {
        Self { engine, options }
    }

    pub fn from_settings(settings: &SimulationSettings, options: RunOptions) -> Self {
        let engine = Engine::random(settings.engine_config(), settings.agent_count);
        Self::new(engine, options)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn run(&mut self) -> RunSummary {
        for spawn in self.options.spawns.drain(..) {
            spawn.apply(&mut self.engine);
        }

        log::info!(
            "Running {} ticks with {} agents ({:?} boundary)",
            self.options.ticks,
            self.engine.len(),
            self.engine.boundary_mode()
        );

        let mut ticks_run = 0;
        while ticks_run < self.options.ticks {
            self.engine.advance_tick();
            ticks_run += 1;

            let stats = PopulationStats::from_engine(&self.engine);

            if self.options.report_every > 0 && ticks_run % self.options.report_every == 0 {
                log::info!("{}", stats);
            }

            if let Some(every) = self.options.toggle_every.filter(|&every| every > 0) {
                if ticks_run % every == 0 {
                    self.engine.toggle_boundary_mode();
                    log::debug!(
                        "Boundary mode is now {:?} after tick {}",
                        self.engine.boundary_mode(),
                        ticks_run
                    );
                }
            }

            if self.options.stop_on_winner {
                if let Some(winner) = stats.winner() {
                    log::info!("{} took over the world after {} ticks", winner, ticks_run);
                    break;
                }
            }
        }

        RunSummary {
            ticks_run,
            boundary: self.engine.boundary_mode(),
            stats: PopulationStats::from_engine(&self.engine),
        }
    }
}
