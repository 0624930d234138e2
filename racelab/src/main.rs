//! # Racelab runtime
//!
//! Entry point for the `racelab` binary. Each subcommand runs one stage of
//! the pipeline and prints its result as JSON on stdout; logs go to stderr
//! and are filtered with `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use physics::{TireCompound, Weather};
use racelab::commands;
use racelab::config::RacelabConfig;
use rl::{RaceState, TrackStatus};
use scenario::{LiveQuery, LookupService};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "racelab")]
#[command(about = "Train, compile and serve racing-line decisions", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Track description JSON; the reference circuit when omitted
    #[arg(long, global = true)]
    track: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a policy with PPO
    Train {
        #[arg(long, default_value_t = 100)]
        iterations: u64,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        workers: Option<usize>,

        /// Directory for checkpoints
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Checkpoint to continue from
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Compile the scenario database
    Compile {
        /// Output database path
        #[arg(long)]
        out: PathBuf,

        /// Policy checkpoint; the line follower when omitted
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        /// Metres per position bucket
        #[arg(long)]
        position_step: Option<f32>,

        #[arg(long)]
        rollout_steps: Option<u32>,
    },

    /// Answer a single query
    Lookup {
        #[arg(long)]
        db: PathBuf,

        /// Distance along the racing line in metres
        #[arg(long)]
        distance: f32,

        /// Speed in km/h
        #[arg(long)]
        speed: f32,

        #[arg(long, default_value = "SOFT")]
        compound: TireCompound,

        #[arg(long, default_value = "dry")]
        weather: Weather,
    },

    /// Answer JSON queries from stdin, one per line, reloading the database
    /// whenever it is rewritten
    Serve {
        #[arg(long)]
        db: PathBuf,
    },

    /// Print database metadata and lookup statistics
    Stats {
        #[arg(long)]
        db: PathBuf,
    },

    /// Describe the track, or build a description from reference telemetry
    Track {
        /// Telemetry JSON to build from
        #[arg(long, requires = "out")]
        telemetry: Option<PathBuf>,

        /// Where to write the built description
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, default_value = "telemetry")]
        name: String,

        /// Half width in metres on each side of the line
        #[arg(long, default_value_t = 7.5)]
        half_width: f32,
    },

    /// Drive one lap and compare sector times with the reference
    Evaluate {
        /// Policy checkpoint; the line follower when omitted
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[arg(long, default_value_t = 3)]
        sectors: usize,
    },

    /// Replay a telemetry speed trace through the car model
    Validate {
        #[arg(long)]
        telemetry: PathBuf,
    },

    /// Forecast stints and make the pit call for one lap of a race
    Strategy {
        #[arg(long)]
        lap: u32,

        #[arg(long)]
        total_laps: u32,

        #[arg(long, default_value_t = 10)]
        position: u32,

        #[arg(long, default_value = "MEDIUM")]
        compound: TireCompound,

        /// Laps run on the current set
        #[arg(long)]
        tire_life: u32,

        /// Seconds to the car ahead
        #[arg(long, default_value_t = 5.0)]
        gap_ahead: f32,

        /// Seconds to the car behind
        #[arg(long, default_value_t = 5.0)]
        gap_behind: f32,

        /// green, yellow or safety_car
        #[arg(long, default_value = "green")]
        status: TrackStatus,

        #[arg(long, default_value_t = 3)]
        overcut_laps: u32,
    },

    /// Replay a recorded race and compare pit calls with the stops made
    Backtest {
        /// JSON array of recorded laps
        #[arg(long)]
        history: PathBuf,

        #[arg(long)]
        driver: String,
    },

    /// Race evaluated laps against each other and print the classification
    Race {
        #[arg(long, default_value_t = 20)]
        laps: u32,

        /// JSON array of entries; one line follower per compound when omitted
        #[arg(long)]
        entries: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = RacelabConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Train { iterations, seed, workers, checkpoint_dir, resume } => {
            if let Some(seed) = seed {
                config.trainer.seed = seed;
            }
            if let Some(workers) = workers {
                config.trainer.workers = workers;
            }
            if checkpoint_dir.is_some() {
                config.trainer.checkpoint_dir = checkpoint_dir;
            }
            let track = commands::load_track(cli.track.as_deref())?;
            let summary = commands::train(track, &config.env, &config.trainer, iterations, resume.as_deref())?;
            print_json(&summary)
        }

        Commands::Compile { out, checkpoint, seed, position_step, rollout_steps } => {
            let mut compiler = config.compiler();
            if let Some(seed) = seed {
                compiler.seed = seed;
            }
            if let Some(step) = position_step {
                compiler.grid.position_step = step;
            }
            if let Some(steps) = rollout_steps {
                compiler.rollout_steps = steps;
            }
            let track = commands::load_track(cli.track.as_deref())?;
            let stats = commands::compile_database(&track, &compiler, checkpoint.as_deref(), &out)?;
            print_json(&stats)
        }

        Commands::Lookup { db, distance, speed, compound, weather } => {
            let query = LiveQuery::new(distance, speed, compound, weather);
            print_json(&commands::lookup(&db, config.lookup, &query)?)
        }

        Commands::Serve { db } => {
            let service = Arc::new(LookupService::open(&db, config.lookup)?);
            let _watcher = match racelab::watcher::start(Arc::clone(&service), &db) {
                Ok(w) => Some(w),
                Err(e) => {
                    error!("database watcher unavailable: {e:?}");
                    None
                }
            };
            let answered = commands::serve(&service, std::io::stdin().lock(), std::io::stdout().lock())?;
            info!(answered, "input closed");
            print_json(&service.stats())
        }

        Commands::Stats { db } => print_json(&commands::stats(&db, config.lookup)?),

        Commands::Track { telemetry, out, name, half_width } => match (telemetry, out) {
            (Some(telemetry), Some(out)) => {
                print_json(&commands::track_from_telemetry(&telemetry, &name, half_width, &out)?)
            }
            _ => {
                let track = commands::load_track(cli.track.as_deref())?;
                print_json(&commands::summarize_track(&track))
            }
        },

        Commands::Evaluate { checkpoint, sectors } => {
            let track = commands::load_track(cli.track.as_deref())?;
            print_json(&commands::evaluate(track, &config.env, checkpoint.as_deref(), sectors)?)
        }

        Commands::Validate { telemetry } => print_json(&commands::validate(&telemetry, &config.env)?),

        Commands::Strategy {
            lap,
            total_laps,
            position,
            compound,
            tire_life,
            gap_ahead,
            gap_behind,
            status,
            overcut_laps,
        } => {
            let state = RaceState {
                current_lap: lap,
                total_laps,
                position,
                compound,
                tire_life,
                gap_ahead,
                gap_behind,
                track_status: status,
            };
            let track = commands::load_track(cli.track.as_deref())?;
            print_json(&commands::strategy(&track, &config.env, &config.strategy, &state, overcut_laps)?)
        }

        Commands::Backtest { history, driver } => {
            let track = commands::load_track(cli.track.as_deref())?;
            print_json(&commands::backtest(&track, &config.env, &config.strategy, &history, &driver)?)
        }

        Commands::Race { laps, entries } => {
            let track = commands::load_track(cli.track.as_deref())?;
            print_json(&commands::race(track, &config.env, &config.strategy, entries.as_deref(), laps)?)
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
