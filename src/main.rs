//! Demo driver for gated system groups.
//!
//! Builds a small pipeline and steps it for a number of ticks:
//!
//! - `Strike` marks a random target with a per-tick [`Hit`] component
//! - `ApplyHits` turns hits into health loss
//! - a sweep clears every [`Hit`] at the end of the tick
//! - the `"render"` group (`Draw`, `Present`) starts disabled and is switched
//!   by toggle records written into the `"events"` world at random
//!
//! # Running
//!
//! ```sh
//! cargo run -- --ticks 20 --seed 7 --json
//! RUST_LOG=debug cargo run -- --config pipeline.ini
//! ```

use bevy_ecs::prelude::*;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use ecsgroups::error::PipelineResult;
use ecsgroups::events::grouptoggle::{ToggleRecord, send_toggle};
use ecsgroups::pipeline::Pipeline;
use ecsgroups::resources::pipelineconfig::PipelineConfig;
use ecsgroups::system::{DestroySystem, InitSystem, RunSystem, System};
use ecsgroups::worlds::Worlds;

const EVENTS_WORLD: &str = "events";
const RENDER_GROUP: &str = "render";
const TARGETS: usize = 4;

/// Gated system groups demo
#[derive(Parser)]
#[command(version, about = "Steps a pipeline with a toggleable render group.")]
struct Cli {
    /// Number of ticks to run.
    #[arg(long, default_value_t = 10)]
    ticks: u32,

    /// INI configuration file (default: ./pipeline.ini if present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for target selection and toggles.
    #[arg(long)]
    seed: Option<u64>,

    /// Probability per tick of sending a toggle record to the render group.
    #[arg(long, default_value_t = 0.3)]
    toggle_chance: f64,

    /// Print one JSON report per tick instead of log lines.
    #[arg(long)]
    json: bool,
}

#[derive(Component, Debug)]
struct Health(i32);

#[derive(Component, Debug)]
struct Hit(i32);

#[derive(Resource, Default, Debug)]
struct RenderStats {
    drawn: usize,
    presented: u64,
}

#[derive(Serialize)]
struct TickReport {
    tick: u32,
    drawn: usize,
    presented: u64,
    total_health: i32,
    pending_toggles: usize,
}

struct Strike {
    rng: fastrand::Rng,
}

impl InitSystem for Strike {
    fn init(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let world = worlds.default_world_mut();
        for _ in 0..TARGETS {
            world.spawn(Health(100));
        }
        world.init_resource::<RenderStats>();
        Ok(())
    }
}

impl RunSystem for Strike {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let world = worlds.default_world_mut();
        let targets: Vec<Entity> = world
            .query_filtered::<Entity, With<Health>>()
            .iter(world)
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        let target = targets[self.rng.usize(..targets.len())];
        world.entity_mut(target).insert(Hit(self.rng.i32(1..=10)));
        Ok(())
    }
}

impl System for Strike {
    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        Some(self)
    }

    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }
}

struct ApplyHits;

impl RunSystem for ApplyHits {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let world = worlds.default_world_mut();
        for (hit, mut health) in world.query::<(&Hit, &mut Health)>().iter_mut(world) {
            health.0 -= hit.0;
        }
        Ok(())
    }
}

impl System for ApplyHits {
    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }
}

struct Draw;

impl RunSystem for Draw {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let world = worlds.default_world_mut();
        let drawn = world.query::<&Health>().iter(world).count();
        world.resource_mut::<RenderStats>().drawn = drawn;
        Ok(())
    }
}

impl System for Draw {
    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }
}

struct Present;

impl RunSystem for Present {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        worlds
            .default_world_mut()
            .resource_mut::<RenderStats>()
            .presented += 1;
        Ok(())
    }
}

impl DestroySystem for Present {
    fn destroy(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let presented = worlds.default_world().resource::<RenderStats>().presented;
        log::info!("Presented {} frames", presented);
        Ok(())
    }
}

impl System for Present {
    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        Some(self)
    }
}

fn load_config(cli: &Cli) -> PipelineConfig {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::with_path(path),
        None => PipelineConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        if cli.config.is_some() {
            log::warn!("{}", e);
        } else {
            log::debug!("{}", e);
        }
    }
    config.add_world(EVENTS_WORLD);
    config
}

fn report(pipeline: &mut Pipeline, tick: u32) -> PipelineResult<TickReport> {
    let world = pipeline.world_mut(None)?;
    let total_health: i32 = world.query::<&Health>().iter(world).map(|h| h.0).sum();
    let stats = world.resource::<RenderStats>();
    let (drawn, presented) = (stats.drawn, stats.presented);

    let events = pipeline.world_mut(Some(EVENTS_WORLD))?;
    let pending_toggles = events
        .query::<&ToggleRecord<String>>()
        .iter(events)
        .count();

    Ok(TickReport {
        tick,
        drawn,
        presented,
        total_health,
        pending_toggles,
    })
}

fn run(cli: Cli) -> PipelineResult<()> {
    let config = load_config(&cli);
    let mut rng = match cli.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let mut pipeline = Pipeline::with_config(World::new(), &config);
    pipeline
        .add(Strike { rng: rng.fork() })
        .add(ApplyHits)
        .add_named_group(
            RENDER_GROUP,
            false,
            Some(EVENTS_WORLD),
            vec![Box::new(Draw), Box::new(Present)],
        )?
        .sweep::<Hit>(None)?;

    pipeline.init()?;
    for tick in 1..=cli.ticks {
        if rng.f64() < cli.toggle_chance {
            let state = rng.bool();
            log::info!("Tick {}: requesting render {}", tick, state);
            send_toggle(
                pipeline.world_mut(Some(EVENTS_WORLD))?,
                RENDER_GROUP.to_string(),
                state,
            );
        }

        pipeline.run()?;

        let report = report(&mut pipeline, tick)?;
        if cli.json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to serialize tick report: {}", e),
            }
        } else {
            log::info!(
                "Tick {}: drawn={} presented={} health={}",
                report.tick,
                report.drawn,
                report.presented,
                report.total_health
            );
        }
    }
    pipeline.destroy()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
