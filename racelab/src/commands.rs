//! Subcommand bodies.
//!
//! Each function does one stage of the pipeline and returns a serializable
//! summary; `main` only parses flags and prints.

use anyhow::{Context, Result};
use physics::{CarDynamics, TireCompound};
use rl::{
    evaluate_lap, simulate_race, validate_speed_trace, BacktestReport, Checkpoint, Entrant, EnvConfig, GreedyPolicy,
    HistoricLap, IterationReport, LapComparison, LineFollower, PitDecision, PitWindow, PlannedStop, Policy,
    PpoTrainer, RaceResult, RaceState, SpeedTraceReport, StintForecast, StintModel, StrategyConfig, TrackStatus,
    TrainerConfig,
};
use scenario::{
    AggregateStats, CompileStats, CompilerConfig, DatabaseMeta, LiveQuery, LookupConfig, LookupService,
    PolicySource, Recommendation, ScenarioError,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use track::{description_from_telemetry, TrackDescription, TrackGeometry};

/// The track at `path`, or the built-in reference circuit.
///
/// # Errors
///
/// The description cannot be read or fails validation.
pub fn load_track(path: Option<&Path>) -> Result<Arc<TrackGeometry>> {
    let track = match path {
        Some(path) => TrackGeometry::load(path).with_context(|| format!("loading track {}", path.display()))?,
        None => track::reference_circuit().context("building the reference circuit")?,
    };
    Ok(Arc::new(track))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub label: String,
    pub apex_distance: f32,
    pub apex_speed: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub name: String,
    pub length: f32,
    pub closed: bool,
    pub points: usize,
    pub reference_lap_time: f32,
    pub turns: Vec<TurnSummary>,
}

#[must_use]
pub fn summarize_track(track: &TrackGeometry) -> TrackSummary {
    TrackSummary {
        name: track.name().to_string(),
        length: track.length(),
        closed: track.is_closed(),
        points: track.points().len(),
        reference_lap_time: track.reference_lap_time(),
        turns: track
            .turns()
            .iter()
            .map(|t| TurnSummary { label: t.label(), apex_distance: t.apex_distance, apex_speed: t.apex_speed })
            .collect(),
    }
}

/// Build a track description from reference telemetry, check that it
/// loads, and write it to `out`.
///
/// # Errors
///
/// Unreadable telemetry, invalid track data or a failed write.
pub fn track_from_telemetry(telemetry: &Path, name: &str, half_width: f32, out: &Path) -> Result<TrackSummary> {
    let samples = track::telemetry::load_samples(telemetry)
        .with_context(|| format!("loading telemetry {}", telemetry.display()))?;
    let description: TrackDescription = description_from_telemetry(name, &samples, half_width)?;
    let geometry = TrackGeometry::from_description(&description)?;
    std::fs::write(out, serde_json::to_string_pretty(&description)?)
        .with_context(|| format!("writing track {}", out.display()))?;
    info!(path = %out.display(), samples = samples.len(), turns = geometry.turns().len(), "track description written");
    Ok(summarize_track(&geometry))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub iterations: usize,
    pub episodes: u64,
    pub moving_average: Option<f32>,
    pub latest_checkpoint: Option<String>,
    pub best_checkpoint: Option<String>,
    pub last: Option<IterationReport>,
}

/// Train for `iterations` iterations, optionally resuming from a
/// checkpoint. When a checkpoint directory is configured the final
/// parameters are checkpointed too.
///
/// # Errors
///
/// Configuration, stall or checkpoint failures.
pub fn train(
    track: Arc<TrackGeometry>,
    env: &EnvConfig,
    config: &TrainerConfig,
    iterations: u64,
    resume: Option<&Path>,
) -> Result<TrainSummary> {
    let mut trainer = match resume {
        Some(path) => {
            let checkpoint =
                Checkpoint::load(path).with_context(|| format!("loading checkpoint {}", path.display()))?;
            PpoTrainer::resume(track, env.clone(), config.clone(), &checkpoint)?
        }
        None => PpoTrainer::new(track, env.clone(), config.clone())?,
    };
    let reports = trainer.train(iterations, |_| {})?;
    if config.checkpoint_dir.is_some() && !reports.is_empty() {
        trainer.checkpoint()?;
    }
    Ok(TrainSummary {
        iterations: reports.len(),
        episodes: trainer.episodes(),
        moving_average: trainer.moving_average(),
        latest_checkpoint: trainer.latest_checkpoint().map(|c| c.id.clone()),
        best_checkpoint: trainer.best_checkpoint().map(|c| c.id.clone()),
        last: reports.last().cloned(),
    })
}

/// The trained network from `checkpoint`, or the rule-based driver.
///
/// # Errors
///
/// The checkpoint cannot be loaded or verified, or its network does not
/// fit the racing observation and action.
pub fn load_policy(checkpoint: Option<&Path>) -> Result<(Box<dyn Policy>, PolicySource)> {
    match checkpoint {
        Some(path) => {
            let checkpoint =
                Checkpoint::load(path).with_context(|| format!("loading checkpoint {}", path.display()))?;
            let policy = GreedyPolicy::from_checkpoint(&checkpoint)
                .with_context(|| format!("checkpoint {} cannot drive the racing environment", path.display()))?;
            Ok((Box::new(policy), PolicySource::new("ppo", Some(checkpoint.id))))
        }
        None => Ok((Box::new(LineFollower::default()), PolicySource::new("line-follower", None))),
    }
}

/// Compile and save the scenario database.
///
/// # Errors
///
/// Policy loading, compilation or write failures.
pub fn compile_database(
    track: &Arc<TrackGeometry>,
    config: &CompilerConfig,
    checkpoint: Option<&Path>,
    out: &Path,
) -> Result<CompileStats> {
    let (policy, source) = load_policy(checkpoint)?;
    let compilation = scenario::compile(track, policy.as_ref(), config, &source)?;
    compilation.database.save(out).with_context(|| format!("writing database {}", out.display()))?;
    Ok(compilation.stats)
}

/// # Errors
///
/// An unusable environment, or a checkpoint that cannot be loaded.
pub fn evaluate(
    track: Arc<TrackGeometry>,
    env: &EnvConfig,
    checkpoint: Option<&Path>,
    sectors: usize,
) -> Result<LapComparison> {
    env.validate()?;
    let (policy, _) = load_policy(checkpoint)?;
    Ok(evaluate_lap(track, env, policy.as_ref(), sectors))
}

/// # Errors
///
/// Unreadable telemetry or a diverging replay.
pub fn validate(telemetry: &Path, env: &EnvConfig) -> Result<SpeedTraceReport> {
    let samples = track::telemetry::load_samples(telemetry)
        .with_context(|| format!("loading telemetry {}", telemetry.display()))?;
    let dynamics = CarDynamics::new(env.car.clone(), env.weather);
    Ok(validate_speed_trace(&samples, &dynamics, env.compound, env.dt)?)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub stints: Vec<StintForecast>,
    pub window: PitWindow,
    pub decision: PitDecision,
    /// Seconds gained by stopping now on a car ahead whose set is older.
    pub undercut: f32,
    /// Seconds gained by staying out `overcut_laps` more than a rival who stops now.
    pub overcut: f32,
    pub overcut_laps: u32,
}

/// Stint forecasts for every compound and the pit call for `state`.
///
/// # Errors
///
/// Unusable strategy settings.
pub fn strategy(
    track: &TrackGeometry,
    env: &EnvConfig,
    config: &StrategyConfig,
    state: &RaceState,
    overcut_laps: u32,
) -> Result<StrategyReport> {
    let model = StintModel::for_track(track, env, config.clone())?;
    let report = StrategyReport {
        stints: TireCompound::ALL.iter().map(|&c| model.forecast(c)).collect(),
        window: model.find_pit_window(state, &TireCompound::ALL),
        decision: model.make_decision(state),
        undercut: model.undercut_advantage(state, state.tire_life + config.undercut_opponent_extra_life),
        overcut: model.overcut_advantage(state, overcut_laps),
        overcut_laps,
    };
    info!(
        lap = state.current_lap,
        pit = report.decision.should_pit,
        compound = %report.decision.recommended_compound,
        "pit call made"
    );
    Ok(report)
}

/// # Errors
///
/// Unreadable history, unusable settings or no laps for `driver`.
pub fn backtest(
    track: &TrackGeometry,
    env: &EnvConfig,
    config: &StrategyConfig,
    history: &Path,
    driver: &str,
) -> Result<BacktestReport> {
    let text = std::fs::read_to_string(history).with_context(|| format!("reading race history {}", history.display()))?;
    let laps: Vec<HistoricLap> =
        serde_json::from_str(&text).with_context(|| format!("parsing race history {}", history.display()))?;
    let model = StintModel::for_track(track, env, config.clone())?;
    Ok(model.backtest(driver, &laps)?)
}

/// One car on the grid of [`race`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub driver: String,
    /// Policy checkpoint; the line follower when absent.
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
    pub compound: TireCompound,
    #[serde(default)]
    pub stops: Vec<PlannedStop>,
}

/// The line follower once on each compound, each stopping in its own best
/// window when one beats running to the flag.
#[must_use]
pub fn default_entries(model: &StintModel, laps: u32) -> Vec<RaceEntry> {
    TireCompound::ALL
        .iter()
        .enumerate()
        .map(|(i, &compound)| {
            let start = RaceState {
                current_lap: 1,
                total_laps: laps,
                position: i as u32 + 1,
                compound,
                tire_life: 0,
                gap_ahead: 0.0,
                gap_behind: 0.0,
                track_status: TrackStatus::Green,
            };
            let stops = model
                .find_pit_window(&start, &TireCompound::ALL)
                .worthwhile()
                .map(|(lap, compound, _)| PlannedStop { lap, compound })
                .into_iter()
                .collect();
            RaceEntry { driver: format!("line-follower/{compound}"), checkpoint: None, compound, stops }
        })
        .collect()
}

/// Evaluate one lap per entry on its starting compound and race the
/// entries over `laps` laps.
///
/// # Errors
///
/// An unusable environment or strategy, an unreadable entry list or
/// checkpoint, or an invalid race plan.
pub fn race(
    track: Arc<TrackGeometry>,
    env: &EnvConfig,
    config: &StrategyConfig,
    entries: Option<&Path>,
    laps: u32,
) -> Result<RaceResult> {
    env.validate()?;
    let model = StintModel::for_track(&track, env, config.clone())?;
    let entries = match entries {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading entries {}", path.display()))?;
            serde_json::from_str::<Vec<RaceEntry>>(&text)
                .with_context(|| format!("parsing entries {}", path.display()))?
        }
        None => default_entries(&model, laps),
    };
    let entrants = entries
        .into_iter()
        .map(|entry| {
            let (policy, _) = load_policy(entry.checkpoint.as_deref())?;
            let env = EnvConfig { compound: entry.compound, ..env.clone() };
            let pace = evaluate_lap(Arc::clone(&track), &env, policy.as_ref(), 3);
            if pace.lap_time.is_none() {
                warn!(driver = %entry.driver, outcome = %pace.outcome, "pace lap not completed");
            }
            Ok(Entrant { driver: entry.driver, compound: entry.compound, stops: entry.stops, pace })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(simulate_race(&model, &entrants, laps)?)
}

/// A lookup outcome as the caller sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupAnswer {
    Match(Recommendation),
    NoCoverage { nearest: Option<f32> },
    Timeout { budget_ms: f64 },
}

impl LookupAnswer {
    /// # Errors
    ///
    /// Errors other than the two fallback conditions.
    pub fn from_result(result: Result<Recommendation, ScenarioError>) -> Result<Self> {
        match result {
            Ok(r) => Ok(Self::Match(r)),
            Err(ScenarioError::NoCoverage { nearest, .. }) => Ok(Self::NoCoverage { nearest }),
            Err(ScenarioError::QueryTimeout { budget_ms }) => Ok(Self::Timeout { budget_ms }),
            Err(e) => Err(e.into()),
        }
    }
}

/// # Errors
///
/// The database cannot be opened.
pub fn lookup(db: &Path, config: LookupConfig, query: &LiveQuery) -> Result<LookupAnswer> {
    let service =
        LookupService::open(db, config).with_context(|| format!("opening database {}", db.display()))?;
    LookupAnswer::from_result(service.lookup(query))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseReport {
    pub meta: DatabaseMeta,
    pub stats: AggregateStats,
}

/// # Errors
///
/// The database cannot be opened.
pub fn stats(db: &Path, config: LookupConfig) -> Result<DatabaseReport> {
    let service =
        LookupService::open(db, config).with_context(|| format!("opening database {}", db.display()))?;
    Ok(DatabaseReport { meta: service.current().meta().clone(), stats: service.stats() })
}

/// Answer line-delimited JSON queries. A blank line prints the current
/// statistics. Returns the number of queries answered.
///
/// # Errors
///
/// I/O failure on either stream.
pub fn serve(service: &LookupService, input: impl BufRead, mut output: impl Write) -> Result<u64> {
    let mut answered = 0;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            serde_json::to_writer(&mut output, &service.stats())?;
        } else {
            match serde_json::from_str::<LiveQuery>(line) {
                Ok(query) => {
                    let answer = LookupAnswer::from_result(service.lookup(&query))?;
                    serde_json::to_writer(&mut output, &answer)?;
                    answered += 1;
                }
                Err(e) => {
                    warn!(error = %e, "unparseable query");
                    serde_json::to_writer(&mut output, &serde_json::json!({ "status": "error", "error": e.to_string() }))?;
                }
            }
        }
        writeln!(output)?;
        output.flush()?;
    }
    Ok(answered)
}
