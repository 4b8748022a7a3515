//! Emitter config inspection command

use anyhow::{Context, Result};
use ember_particles::{EmissionShape, EmitterConfig};

pub struct InspectArgs {
    pub config: String,
    pub format: String,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let config = EmitterConfig::load(&args.config)
        .with_context(|| format!("failed to load emitter config {}", args.config))?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Emitter: {}", args.config);
    println!("  emission rate:  {}/s", config.emission_rate);
    println!("  burst:          {}", config.burst_count);
    println!("  max particles:  {}", config.max_particles);
    println!(
        "  lifetime:       {}s .. {}s",
        config.lifetime_min, config.lifetime_max
    );
    println!("  speed:          {} .. {}", config.speed_min, config.speed_max);
    println!(
        "  direction:      {}° ± {}°",
        config.direction, config.spread
    );
    println!(
        "  gravity:        [{}, {}]",
        config.gravity[0], config.gravity[1]
    );
    println!("  damping:        {}", config.damping);
    println!(
        "  spin:           {} .. {} rad/s",
        config.angular_velocity_min, config.angular_velocity_max
    );
    println!("  size:           {} -> {}", config.size_start, config.size_end);
    println!(
        "  color:          {:?} -> {:?}",
        config.color_start.to_array(),
        config.color_end.to_array()
    );
    match config.shape {
        EmissionShape::Point => println!("  shape:          point"),
        EmissionShape::Circle { radius } => println!("  shape:          circle r={}", radius),
        EmissionShape::Box { extents } => {
            println!("  shape:          box {}x{}", extents[0], extents[1])
        }
    }
    println!("  seed:           {:#x}", config.seed);

    Ok(())
}
