//! Headless simulation command

use crate::clock::FrameClock;
use anyhow::{bail, Context, Result};
use ember_particles::{EmitterConfig, EmitterParticle, ParticleSystem, Vec2};
use log::info;
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub struct SimulateArgs {
    pub config: String,
    pub frames: u64,
    pub fps: f64,
    pub burst: usize,
    pub reset_at: Option<u64>,
    pub every: u64,
    pub format: String,
}

/// Particle statistics after one frame
#[derive(Debug, Serialize)]
struct FrameStats {
    frame: u64,
    time: f64,
    dt: f64,
    alive: usize,
    spawned: usize,
    died: usize,
    mean_position: [f64; 2],
    mean_speed: f64,
    oldest: f64,
}

impl FrameStats {
    fn collect(
        system: &ParticleSystem<EmitterParticle>,
        now: Instant,
        frame: u64,
        clock: &FrameClock,
        spawned: usize,
        died: usize,
    ) -> Self {
        let mut position_sum = Vec2::ZERO;
        let mut speed_sum = 0.0;
        let mut oldest: f64 = 0.0;
        system.for_each_particle(now, |p, t, _| {
            position_sum = position_sum + p.position();
            speed_sum += p.velocity().magnitude();
            oldest = oldest.max(t.value());
        });

        let alive = system.num_particles();
        let n = alive.max(1) as f64;
        Self {
            frame,
            time: clock.total_time,
            dt: clock.delta_time,
            alive,
            spawned,
            died,
            mean_position: (position_sum * (1.0 / n)).to_array(),
            mean_speed: speed_sum / n,
            oldest,
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    frames: u64,
    total_spawned: usize,
    total_died: usize,
    peak_alive: usize,
    final_alive: usize,
}

#[derive(Serialize)]
struct Report {
    config: String,
    fps: f64,
    frames: Vec<FrameStats>,
    summary: Summary,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be a positive number, got {}", args.fps);
    }

    let config = EmitterConfig::load(&args.config)
        .with_context(|| format!("failed to load emitter config {}", args.config))?;
    info!(
        "simulating {} for {} frame(s) at {} fps",
        args.config, args.frames, args.fps
    );

    let mut system = config.build();
    let deaths = Rc::new(Cell::new(0usize));
    let death_count = deaths.clone();
    system
        .behaviors
        .set_death_func(move |_, _| death_count.set(death_count.get() + 1));
    if args.burst > 0 {
        system.spawn(args.burst);
    }

    let every = args.every.max(1);
    let mut clock = FrameClock::with_fps(args.fps);
    let mut reported = Vec::new();
    let mut summary = Summary::default();

    for frame in 0..args.frames {
        if args.reset_at == Some(frame) {
            info!("resetting system before frame {frame}");
            system.reset();
        }

        let now = clock.tick();
        let alive_before = system.num_particles();
        let deaths_before = deaths.get();

        system.update(now);

        let died = deaths.get() - deaths_before;
        let spawned = system.num_particles() + died - alive_before;
        let stats = FrameStats::collect(&system, now, frame, &clock, spawned, died);

        summary.frames += 1;
        summary.total_spawned += spawned;
        summary.total_died += died;
        summary.peak_alive = summary.peak_alive.max(stats.alive);
        summary.final_alive = stats.alive;

        if frame % every == 0 || frame + 1 == args.frames {
            if args.format == "text" {
                print_frame(&stats);
            }
            reported.push(stats);
        }
    }

    if args.format == "json" {
        let report = Report {
            config: args.config,
            fps: args.fps,
            frames: reported,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_frame(stats: &FrameStats) {
    println!(
        "frame {:>5}  t={:>7.3}s  alive {:>6}  +{:<4} -{:<4} mean ({:>8.2}, {:>8.2})  speed {:>7.2}  oldest {:.2}",
        stats.frame,
        stats.time,
        stats.alive,
        stats.spawned,
        stats.died,
        stats.mean_position[0],
        stats.mean_position[1],
        stats.mean_speed,
        stats.oldest
    );
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Summary:");
    println!("  frames:        {}", summary.frames);
    println!("  spawned:       {}", summary.total_spawned);
    println!("  died:          {}", summary.total_died);
    println!("  peak alive:    {}", summary.peak_alive);
    println!("  final alive:   {}", summary.final_alive);
}
