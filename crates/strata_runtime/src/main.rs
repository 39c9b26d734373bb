//! Strata Runtime
//!
//! Demo binary: loads a world config, spawns a drifting swarm and steps it
//! for a fixed number of ticks.
//!
//! Usage: `strata [config.json] [ticks]`

use anyhow::{Context, Result};
use strata_core::ecs::{Column, ComponentValue, Entity, EntityBuilder, Stage, SystemDescriptor};
use strata_core::time::TICK_DURATION;
use strata_core::{World, WorldConfig, WorldResult};

const DEMO_CONFIG: &str = include_str!("../config/demo.json");
const DEFAULT_TICKS: u64 = 120;
const SWARM_SIZE: usize = 256;
const BOUNDS: f32 = 100.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Strata v{}", strata_core::VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WorldConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => WorldConfig::from_json_str(DEMO_CONFIG).context("parsing built-in demo config")?,
    };
    let ticks = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid tick count '{raw}'"))?,
        None => DEFAULT_TICKS,
    };

    let mut world = World::with_config(config).context("building world")?;
    let position = world.schema_id("Position").context("config must define Position")?;
    let velocity = world.schema_id("Velocity").context("config must define Velocity")?;
    let lifecycle = world.enable_lifecycle_events();

    world.on_resize(|capacity| tracing::info!(capacity, "entity storage grew"));

    let swarm = world.create_archetype(&[position, velocity])?;
    for i in 0..SWARM_SIZE {
        let lane = i as f32;
        world.spawn_in(
            swarm,
            EntityBuilder::new()
                .with(position, ComponentValue::new().with("x", 0.0f32).with("y", lane))
                .with(velocity, ComponentValue::new().with("dx", 0.5 + lane / 64.0)),
        )?;
    }

    let movers = world.register_query(&[position, velocity])?;

    world.register_system(
        SystemDescriptor::new("spawner").in_stage(Stage::PreUpdate),
        move |world, ctx| {
            if ctx.tick % 30 == 0 {
                for _ in 0..8 {
                    world.spawn_in(swarm, EntityBuilder::new().with_default(velocity))?;
                }
            }
            Ok(())
        },
    )?;

    world.register_system(SystemDescriptor::new("movement"), move |world, ctx| {
        let dt = ctx.delta_time as f32;
        world.for_each_match(movers, |archetype, _| {
            let mut columns = archetype.columns_mut(&[position, velocity])?;
            let (positions, velocities) = columns.split_at_mut(1);
            integrate(&mut *positions[0], &*velocities[0], "x", "dx", dt)?;
            integrate(&mut *positions[0], &*velocities[0], "y", "dy", dt)?;
            Ok(())
        })
    })?;

    world.register_system(
        SystemDescriptor::new("reaper").in_stage(Stage::PostUpdate),
        move |world, _| {
            let mut escaped: Vec<Entity> = Vec::new();
            for archetype in world.matched(movers)? {
                let Some(column) = archetype.column(position) else {
                    continue;
                };
                let xs = column.field::<f32>("x")?;
                escaped.extend(
                    archetype
                        .entities()
                        .iter()
                        .zip(xs)
                        .filter(|(_, x)| **x > BOUNDS)
                        .map(|(entity, _)| *entity),
                );
            }
            for entity in escaped {
                world.kill(entity)?;
            }
            Ok(())
        },
    )?;

    world.register_system(
        SystemDescriptor::new("census").in_stage(Stage::PostUpdate),
        move |world, ctx| {
            let killed = world.topic(lifecycle.killed).map_or(0, |topic| topic.ready().len());
            if killed > 0 {
                tracing::debug!(tick = ctx.tick, killed, "entities left the field");
            }
            Ok(())
        },
    )?;

    for _ in 0..ticks {
        world.step_with(TICK_DURATION)?;
    }

    let moving = world.query_count(movers)?;
    tracing::info!(
        ticks = world.tick_count(),
        entities = world.entity_count(),
        archetypes = world.archetype_count(),
        movers = moving,
        "simulation finished"
    );

    strata_metrics::metrics! {
        let metrics = world.metrics();
        for (name, value) in metrics.counters.snapshot() {
            tracing::info!(counter = %name, value, "counter");
        }
        for (name, total) in metrics.profiler.iter() {
            tracing::info!(scope = %name, total_ms = total.as_secs_f64() * 1000.0, "profile");
        }
        tracing::info!(tick_ms = metrics.tick_timer.tick_time_ms(), "average tick");
    }

    world.teardown();
    Ok(())
}

/// `position[axis] += velocity[delta] * dt` for every row.
fn integrate(position: &mut Column, velocity: &Column, axis: &str, delta: &str, dt: f32) -> WorldResult<()> {
    let speeds = velocity.field::<f32>(delta)?;
    for (p, v) in position.field_mut::<f32>(axis)?.iter_mut().zip(speeds) {
        *p += v * dt;
    }
    Ok(())
}
