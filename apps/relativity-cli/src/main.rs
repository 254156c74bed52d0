use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec3;
use relativity_body::{BodyDesc, NullIntegrator};
use relativity_collision::{ContactEvent, ContactKind, ContactPoint, EmptyGeometry};
use relativity_common::{PhysicsMaterial, SimConfig};
use relativity_frame::{
    ConformalMap, FrameContext, FrameParams, Minkowski, gamma, velocity_to_rapidity,
};
use relativity_kernel::{
    AabbContactDetector, CpuDisplacer, PresentedBody, Scene, StepReport, World, WorldEvent,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relativity-cli", about = "Relativistic rigid-body simulation demos")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and default tuning
    Info,
    /// Head-on elastic collision of two equal boxes
    Collide {
        /// Speed of each box as a fraction of the speed of light
        #[arg(short, long, default_value = "0.8")]
        speed: f64,
        /// Speed of light
        #[arg(short, long, default_value = "10")]
        c: f64,
    },
    /// Drop a box onto a static floor under gravity
    Drop {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// Starting height of the box's center
        #[arg(long, default_value = "2.0")]
        height: f64,
        /// Speed of light
        #[arg(short, long, default_value = "200")]
        c: f64,
    },
    /// Run a YAML scene
    Run {
        /// Scene file
        scene: PathBuf,
        /// Number of ticks to simulate; overrides the scene
        #[arg(short, long)]
        ticks: Option<u64>,
    },
}

/// A world driven by the box contact detector.
struct Simulation {
    world: World,
    frame: FrameContext,
    map: Box<dyn ConformalMap>,
    detector: AabbContactDetector,
}

impl Simulation {
    fn new(world: World, frame: FrameContext, map: Box<dyn ConformalMap>) -> Self {
        Self {
            world,
            frame,
            map,
            detector: AabbContactDetector::new(),
        }
    }

    fn tick(&mut self) -> StepReport {
        let map = self.map.as_ref();
        let geometry = self.world.geometry(&self.frame, map);
        for event in self.detector.detect(geometry.boxes()) {
            self.world.submit_contact(event);
        }
        let report = self.world.step(&self.frame, map, &geometry, &mut NullIntegrator);
        self.frame = self.frame.advanced();
        report
    }
}

#[derive(Serialize)]
struct CollideReport {
    speed_of_light: f64,
    before: [DVec3; 2],
    after: [DVec3; 2],
    rapidity_before: f64,
    rapidity_after: f64,
    gamma_after: [f64; 2],
}

#[derive(Serialize)]
struct DropSample {
    tick: u64,
    height: f64,
    velocity: f64,
    sleeping: bool,
}

#[derive(Serialize, Default)]
struct RunSummary {
    scene: String,
    ticks: u64,
    bodies: usize,
    contacts_resolved: usize,
    slept: usize,
    woke: usize,
    retired: usize,
    discarded: usize,
    presented: Vec<PresentedBody>,
}

fn frame_with(c: f64) -> anyhow::Result<FrameContext> {
    FrameContext::new(FrameParams {
        speed_of_light: c,
        max_speed: 0.99 * c,
        ..FrameParams::default()
    })
    .context("invalid frame parameters")
}

fn collide_demo(speed: f64, c: f64) -> anyhow::Result<CollideReport> {
    anyhow::ensure!(speed > 0.0 && speed < 0.98, "speed must lie in (0, 0.98)");
    let frame = frame_with(c)?;
    let mut world = World::new(SimConfig {
        gravity: DVec3::ZERO,
        ..SimConfig::default()
    });
    let v = DVec3::new(speed * c, 0.0, 0.0);
    let material = PhysicsMaterial::frictionless(1.0);
    let a = world.spawn(
        BodyDesc {
            position: DVec3::new(-0.5, 0.0, 0.0),
            velocity: v,
            material,
            ..BodyDesc::default()
        },
        &frame,
    )?;
    let b = world.spawn(
        BodyDesc {
            position: DVec3::new(0.5, 0.0, 0.0),
            velocity: -v,
            material,
            ..BodyDesc::default()
        },
        &frame,
    )?;
    let (ca, cb) = (
        world.collider_of(a).context("missing collider")?,
        world.collider_of(b).context("missing collider")?,
    );
    world.submit_contact(ContactEvent::new(
        ContactKind::Enter,
        ca,
        cb,
        vec![ContactPoint {
            point: DVec3::ZERO,
            normal: -DVec3::X,
        }],
    ));

    let velocities = |world: &World| -> anyhow::Result<[DVec3; 2]> {
        Ok([
            world.get(a).context("body a vanished")?.velocity(),
            world.get(b).context("body b vanished")?.velocity(),
        ])
    };
    let before = velocities(&world)?;
    // resolve, then apply on the following tick
    world.step(&frame, &Minkowski, &EmptyGeometry, &mut NullIntegrator);
    world.step(&frame.advanced(), &Minkowski, &EmptyGeometry, &mut NullIntegrator);
    let after = velocities(&world)?;

    let rapidity = |vs: &[DVec3; 2]| (velocity_to_rapidity(vs[0], c) + velocity_to_rapidity(vs[1], c)).x;
    Ok(CollideReport {
        speed_of_light: c,
        before,
        after,
        rapidity_before: rapidity(&before),
        rapidity_after: rapidity(&after),
        gamma_after: [gamma(after[0], c), gamma(after[1], c)],
    })
}

fn drop_demo(ticks: u64, height: f64, c: f64) -> anyhow::Result<Vec<DropSample>> {
    let frame = frame_with(c)?;
    let mut world = World::new(SimConfig::default());
    world.spawn(
        BodyDesc {
            position: DVec3::new(0.0, -0.5, 0.0),
            half_extents: DVec3::new(10.0, 0.5, 10.0),
            is_static: true,
            ..BodyDesc::default()
        },
        &frame,
    )?;
    let block = world.spawn(
        BodyDesc {
            position: DVec3::new(0.0, height, 0.0),
            use_gravity: true,
            ..BodyDesc::default()
        },
        &frame,
    )?;
    let mut sim = Simulation::new(world, frame, Box::new(Minkowski));
    let mut samples = Vec::new();
    for tick in 1..=ticks {
        sim.tick();
        if tick % 20 == 0 || tick == ticks {
            let body = sim.world.get(block).context("block vanished")?;
            samples.push(DropSample {
                tick,
                height: body.position().y,
                velocity: body.velocity().y,
                sleeping: body.is_sleeping(),
            });
        }
    }
    Ok(samples)
}

fn run_scene(path: &Path, ticks: Option<u64>) -> anyhow::Result<RunSummary> {
    let scene = Scene::load(path).with_context(|| format!("loading {}", path.display()))?;
    let (world, frame) = scene.build()?;
    let ticks = ticks.or(scene.ticks).unwrap_or(100);
    tracing::info!(scene = %scene.name, ticks, "running scene");
    let mut sim = Simulation::new(world, frame, scene.field.conformal_map());
    let mut summary = RunSummary {
        scene: scene.name.clone(),
        ticks,
        ..RunSummary::default()
    };
    for _ in 0..ticks {
        let report = sim.tick();
        summary.discarded += report.discarded;
        for event in sim.world.drain_events() {
            match event {
                WorldEvent::ContactResolved(_) => summary.contacts_resolved += 1,
                WorldEvent::Slept { .. } => summary.slept += 1,
                WorldEvent::Woke { .. } => summary.woke += 1,
                WorldEvent::Retired { .. } => summary.retired += 1,
                _ => {}
            }
        }
    }
    let mut displacer = CpuDisplacer;
    summary.presented = sim.world.present(&sim.frame, sim.map.as_ref(), Some(&mut displacer));
    summary.bodies = sim.world.body_count();
    Ok(summary)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let config = SimConfig::default();
            if cli.json {
                return print_json(&config);
            }
            println!("relativity-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("frame: {}", relativity_frame::crate_info());
            println!("body: {}", relativity_body::crate_info());
            println!("collision: {}", relativity_collision::crate_info());
            println!("kernel: {}", relativity_kernel::crate_info());
            println!(
                "defaults: cooldown={}s sleep_velocity={} sleep_delay={} gravity={}",
                config.contact_cooldown, config.sleep_velocity, config.sleep_frame_delay, config.gravity
            );
        }
        Commands::Collide { speed, c } => {
            let report = collide_demo(speed, c)?;
            if cli.json {
                return print_json(&report);
            }
            println!("Head-on collision at {speed}c (c={c})");
            println!("Before: a={:.6} b={:.6}", report.before[0].x, report.before[1].x);
            println!("After:  a={:.6} b={:.6}", report.after[0].x, report.after[1].x);
            println!(
                "Rapidity sum: {:.9} -> {:.9}",
                report.rapidity_before, report.rapidity_after
            );
            println!(
                "Subluminal: {}",
                if report.after.iter().all(|v| v.length() < c) {
                    "OK"
                } else {
                    "VIOLATED"
                }
            );
        }
        Commands::Drop { ticks, height, c } => {
            let samples = drop_demo(ticks, height, c)?;
            if cli.json {
                return print_json(&samples);
            }
            println!("Drop from y={height}: {ticks} ticks (c={c})");
            for s in &samples {
                println!(
                    "tick={:>5} y={:.5} vy={:+.5}{}",
                    s.tick,
                    s.height,
                    s.velocity,
                    if s.sleeping { " asleep" } else { "" }
                );
            }
        }
        Commands::Run { scene, ticks } => {
            let summary = run_scene(&scene, ticks)?;
            if cli.json {
                return print_json(&summary);
            }
            println!(
                "Scene '{}': {} ticks, {} bodies",
                summary.scene, summary.ticks, summary.bodies
            );
            println!(
                "Contacts resolved: {}, slept: {}, woke: {}, retired: {}, discarded: {}",
                summary.contacts_resolved, summary.slept, summary.woke, summary.retired, summary.discarded
            );
            for body in &summary.presented {
                println!(
                    "  {:?} seen at {:.4} {}",
                    body.collider,
                    body.optical_position,
                    body.vertices
                        .as_ref()
                        .map_or_else(|| "(box)".to_string(), |v| format!("({} vertices)", v.len()))
                );
            }
        }
    }

    Ok(())
}
