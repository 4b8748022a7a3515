//! Ember CLI - headless runner for data-driven particle emitters

mod clock;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, simulate};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Headless runner for Ember particle emitters", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an emitter config at a fixed frame rate and report particle stats
    Simulate {
        /// Path to emitter TOML file
        config: String,

        /// Number of frames to simulate
        #[arg(long, default_value = "300")]
        frames: u64,

        /// Simulated frames per second
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Extra particles requested before the first frame
        #[arg(long, default_value = "0")]
        burst: usize,

        /// Reset the system before this frame
        #[arg(long)]
        reset_at: Option<u64>,

        /// Report every Nth frame
        #[arg(long, default_value = "30")]
        every: u64,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// Print the parsed emitter config with defaults filled in
    Inspect {
        /// Path to emitter TOML file
        config: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still takes precedence over the flags
    let default_level = match (cli.verbose, cli.quiet) {
        (0, true) => "error",
        (0, false) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Simulate {
            config,
            frames,
            fps,
            burst,
            reset_at,
            every,
            format,
        } => simulate::run(simulate::SimulateArgs {
            config,
            frames,
            fps,
            burst,
            reset_at,
            every,
            format,
        }),
        Commands::Inspect { config, format } => {
            inspect::run(inspect::InspectArgs { config, format })
        }
    }
}
