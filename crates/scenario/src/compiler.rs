//! Offline scenario compilation.
//!
//! Every key of the sampling grid gets one or more short forward rollouts
//! from a synthetic car state. Samples are independent, so they run as a
//! parallel map and are merged in sample order, which keeps the output
//! identical for a fixed policy and seed.

use crate::database::ScenarioDatabase;
use crate::error::ScenarioError;
use crate::key::{SamplingGrid, ScenarioKey};
use crate::record::{Coverage, ScenarioRecord};
use physics::{Action, CarState, TireCompound, Weather};
use rayon::prelude::*;
use rl::{EnvConfig, Outcome, Policy, RacingEnv};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use track::TrackGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub grid: SamplingGrid,
    pub seed: u64,
    /// Physics steps per forward rollout.
    pub rollout_steps: u32,
    /// Rollouts per key. The first starts on the bucket centre, the rest are
    /// jittered inside the bucket.
    pub samples_per_key: u32,
    /// Seconds added to the delta of a rollout that left the track.
    pub degraded_penalty: f32,
    /// Base environment; compound, weather and step budget are set per
    /// sample.
    pub env: EnvConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            grid: SamplingGrid::default(),
            seed: 0,
            rollout_steps: 200,
            samples_per_key: 1,
            degraded_penalty: 5.0,
            env: EnvConfig::default(),
        }
    }
}

/// Where the compiled recommendations came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySource {
    pub name: String,
    /// Checkpoint id when the policy is a trained network.
    pub checkpoint: Option<String>,
}

impl PolicySource {
    pub fn new(name: impl Into<String>, checkpoint: Option<String>) -> Self {
        Self { name: name.into(), checkpoint }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileStats {
    pub samples: usize,
    pub records: usize,
    pub converged: usize,
    pub degraded: usize,
    pub position_buckets: u32,
    /// Position buckets with at least one converged record.
    pub covered_positions: u32,
    pub position_coverage: f32,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct Compilation {
    pub database: ScenarioDatabase,
    pub stats: CompileStats,
}

/// Outcome of one forward rollout.
#[derive(Copy, Clone, Debug)]
struct Sample {
    key: ScenarioKey,
    action: Action,
    delta: f32,
    converged: bool,
}

#[derive(Default)]
struct Merge {
    throttle: f32,
    brake: f32,
    steering: f32,
    delta: f32,
    samples: u32,
    converged: bool,
}

impl Merge {
    fn add(&mut self, sample: &Sample) {
        self.converged = if self.samples == 0 { sample.converged } else { self.converged && sample.converged };
        self.throttle += sample.action.throttle;
        self.brake += sample.action.brake;
        self.steering += sample.action.steering;
        self.delta += sample.delta;
        self.samples += 1;
    }

    fn finish(self, key: ScenarioKey) -> ScenarioRecord {
        let n = self.samples.max(1) as f32;
        ScenarioRecord {
            key,
            action: Action::new(self.throttle / n, self.brake / n, self.steering / n),
            predicted_delta: self.delta / n,
            coverage: if self.converged { Coverage::Converged } else { Coverage::Degraded },
            samples: self.samples,
        }
    }
}

/// Sample index decomposed into grid coordinates. Partitions are outermost,
/// then position, speed and sample.
struct Layout {
    partitions: Vec<(TireCompound, Weather)>,
    positions: u32,
    speeds: u32,
    per_key: u32,
}

impl Layout {
    fn new(grid: &SamplingGrid, length: f32, per_key: u32) -> Self {
        let partitions = grid
            .compounds
            .iter()
            .flat_map(|&c| grid.weather.iter().map(move |&w| (c, w)))
            .collect();
        Self { partitions, positions: grid.position_buckets(length), speeds: grid.speed_buckets(), per_key }
    }

    fn len(&self) -> usize {
        self.partitions.len() * self.positions as usize * self.speeds as usize * self.per_key as usize
    }

    fn locate(&self, index: usize) -> (ScenarioKey, u32) {
        let per_key = self.per_key as usize;
        let per_position = self.speeds as usize * per_key;
        let per_partition = self.positions as usize * per_position;
        let (compound, weather) = self.partitions[index / per_partition];
        let rest = index % per_partition;
        let key = ScenarioKey {
            compound,
            weather,
            position: (rest / per_position) as u32,
            speed: ((rest % per_position) / per_key) as u32,
        };
        (key, (rest % per_key) as u32)
    }
}

fn sample_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(index as u64 + 1)
}

/// Run one forward rollout from the synthetic state behind `key`.
fn run_sample(
    track: &Arc<TrackGeometry>,
    policy: &dyn Policy,
    config: &CompilerConfig,
    key: ScenarioKey,
    jittered: bool,
    seed: u64,
) -> Sample {
    let grid = &config.grid;
    let mut rng = fastrand::Rng::with_seed(seed);
    let (jp, js) = if jittered { (0.9 * (rng.f32() - 0.5), 0.9 * (rng.f32() - 0.5)) } else { (0.0, 0.0) };
    let wear = rng.f32() * grid.max_wear;
    let distance = track.normalize_distance(grid.position_of(key.position) + jp * grid.position_step);
    let speed_kmh = (grid.speed_of(key.speed) + js * grid.speed_step_kmh).max(0.0);

    let env_config = EnvConfig {
        compound: key.compound,
        weather: key.weather,
        max_steps: config.rollout_steps,
        record_episode: false,
        ..config.env.clone()
    };
    let mut env = RacingEnv::new(Arc::clone(track), env_config);
    let point = track.point_at(distance);
    let start = CarState::new(point.position, point.heading, speed_kmh / 3.6, key.compound).with_wear(wear);

    let recommended = policy.act(&env.reset_to(start)).clamped();
    let mut action = recommended;
    let outcome = loop {
        let step = env.step_action(action);
        if let Some(outcome) = step.outcome {
            break outcome;
        }
        action = policy.act(&step.obs);
    };

    let from = env.start_distance();
    let reference = track.reference_time(from, from + env.progress().max(0.0));
    let converged = matches!(outcome, Outcome::MaxSteps | Outcome::LapComplete);
    let mut delta = env.elapsed() - reference;
    if !converged {
        delta += config.degraded_penalty;
    }
    Sample { key, action: recommended, delta, converged }
}

/// Sample the grid over `track` with `policy` and build a database.
///
/// # Errors
///
/// [`ScenarioError::InvalidGrid`] for an unusable grid, rollout budget or
/// environment, or a checksum encoding failure.
pub fn compile(
    track: &Arc<TrackGeometry>,
    policy: &dyn Policy,
    config: &CompilerConfig,
    source: &PolicySource,
) -> Result<Compilation, ScenarioError> {
    config.grid.validate()?;
    if config.rollout_steps == 0 || config.samples_per_key == 0 {
        return Err(ScenarioError::InvalidGrid(format!(
            "{} rollout steps, {} samples per key",
            config.rollout_steps, config.samples_per_key
        )));
    }
    EnvConfig { max_steps: config.rollout_steps, ..config.env.clone() }
        .validate()
        .map_err(|e| ScenarioError::InvalidGrid(e.to_string()))?;
    let started = Instant::now();
    let layout = Layout::new(&config.grid, track.length(), config.samples_per_key);
    info!(
        track = track.name(),
        samples = layout.len(),
        partitions = layout.partitions.len(),
        positions = layout.positions,
        speeds = layout.speeds,
        policy = %source.name,
        "compiling scenarios"
    );

    let samples: Vec<Sample> = (0..layout.len())
        .into_par_iter()
        .map(|i| {
            let (key, j) = layout.locate(i);
            run_sample(track, policy, config, key, j > 0, sample_seed(config.seed, i))
        })
        .collect();

    let mut merged: BTreeMap<ScenarioKey, Merge> = BTreeMap::new();
    for sample in &samples {
        merged.entry(sample.key).or_default().add(sample);
    }
    let records: Vec<ScenarioRecord> = merged.into_iter().map(|(key, m)| m.finish(key)).collect();

    let mut covered = vec![false; layout.positions as usize];
    let mut converged = 0;
    for record in &records {
        if record.coverage == Coverage::Converged {
            converged += 1;
            covered[record.key.position as usize] = true;
        }
    }
    let covered_positions = covered.iter().filter(|&&c| c).count() as u32;
    let position_coverage = covered_positions as f32 / layout.positions as f32;

    let stats = CompileStats {
        samples: samples.len(),
        records: records.len(),
        converged,
        degraded: records.len() - converged,
        position_buckets: layout.positions,
        covered_positions,
        position_coverage,
        duration_ms: started.elapsed().as_secs_f64() * 1e3,
    };
    debug!(?stats, "scenario samples merged");
    let database = ScenarioDatabase::new(track, config, source, position_coverage, records)?;
    info!(
        records = stats.records,
        converged = stats.converged,
        degraded = stats.degraded,
        coverage = position_coverage,
        ms = stats.duration_ms,
        "scenario compilation finished"
    );
    Ok(Compilation { database, stats })
}
