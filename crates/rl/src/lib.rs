//! # Racing environment and policy training
//!
//! [`RacingEnv`] composes the physics model and a shared [`TrackGeometry`]
//! into an episodic environment: a 12-value observation, a reward made of
//! separately weighted terms and exactly one terminal [`Outcome`] per
//! episode. [`PpoTrainer`] collects rollouts from several environments in
//! parallel and trains an actor-critic network on them with the clipped
//! PPO objective, writing immutable [`Checkpoint`]s as it goes.
//! [`StintModel`] turns the tyre wear model into stint pace and pit calls,
//! and [`simulate_race`] classifies a race between evaluated laps.
//!
//! ```rust
//! use std::sync::Arc;
//! use rl::{Env, EnvConfig, RacingEnv, OBS_SIZE};
//!
//! let track = Arc::new(track::reference_circuit()?);
//! let mut env = RacingEnv::new(track, EnvConfig::default());
//! let obs = env.reset();
//! assert_eq!(obs.len(), OBS_SIZE);
//! let step = env.step(&[1.0, -1.0, 0.0]);
//! assert!(!step.done);
//! # Ok::<(), track::TrackError>(())
//! ```
//!
//! [`TrackGeometry`]: track::TrackGeometry

pub mod checkpoint;
pub mod classification;
pub mod env;
pub mod error;
pub mod evaluate;
pub mod policy;
pub mod ppo;
pub mod racing;
pub mod strategy;
pub mod validation;

pub use checkpoint::{fingerprint, Checkpoint, CheckpointStore};
pub use classification::{
    simulate_race, ClassifiedEntry, Entrant, Finish, LapStandings, Overtake, PlannedStop, RaceResult, Standing,
};
pub use env::{Env, Outcome, OutcomeCounts, Step};
pub use error::TrainError;
pub use evaluate::{evaluate_lap, LapComparison, SectorTime};
pub use policy::{check_racing_network, GreedyPolicy, LineFollower, Policy};
pub use ppo::{compute_gae, Hyperparameters, IterationReport, PpoTrainer, RegressionMonitor, TrainerConfig};
pub use racing::{Episode, EnvConfig, RacingEnv, RewardWeights, Transition, ACTION_SIZE, LOOKAHEAD_SLOTS, OBS_SIZE};
pub use strategy::{
    BacktestReport, HistoricLap, PitCall, PitDecision, PitWindow, RaceState, Reason, StintForecast, StintLap, StintModel,
    StrategyConfig, TrackStatus,
};
pub use validation::{validate_speed_trace, SpeedTraceReport, MAX_SAMPLE_GAP};
