//! Lap comparison against the track's reference speed profile.

use crate::env::Outcome;
use crate::policy::Policy;
use crate::racing::{EnvConfig, RacingEnv};
use crate::Env;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use track::TrackGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorTime {
    pub index: usize,
    /// Meters of progress where the sector starts.
    pub start: f32,
    pub end: f32,
    /// `None` when the run ended before the sector did.
    pub time: Option<f32>,
    pub reference: f32,
    pub delta: Option<f32>,
}

/// One deterministic run compared with the reference profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapComparison {
    pub track: String,
    pub outcome: Outcome,
    /// Seconds, set only for a completed lap.
    pub lap_time: Option<f32>,
    /// Meters of progress reached.
    pub distance: f32,
    pub elapsed: f32,
    /// Reference time over the distance reached.
    pub reference_time: f32,
    /// `elapsed - reference_time`; negative is faster than the reference.
    pub delta: f32,
    pub sectors: Vec<SectorTime>,
    pub top_speed_kmh: f32,
    pub average_speed_kmh: f32,
    pub steps: u32,
}

/// Reference time for `span` meters from `from`, a full lap included.
fn reference_between(track: &TrackGeometry, from: f32, span: f32) -> f32 {
    if track.is_closed() && span >= track.length() - 1e-3 {
        track.reference_lap_time()
    } else {
        track.reference_time(from, from + span)
    }
}

/// Drive one episode with `policy` from the configured start and compare
/// it, sector by sector, with the reference profile.
#[must_use]
pub fn evaluate_lap(
    track: Arc<TrackGeometry>,
    config: &EnvConfig,
    policy: &dyn Policy,
    sectors: usize,
) -> LapComparison {
    let mut env = RacingEnv::new(Arc::clone(&track), config.clone());
    let mut obs = env.reset();
    let start = env.start_distance();
    let target = env.lap_target();
    let sectors = sectors.max(1);
    let ends: Vec<f32> = (1..=sectors).map(|i| target * i as f32 / sectors as f32).collect();
    let mut crossed: Vec<Option<f32>> = vec![None; sectors];
    let mut top_speed = env.state().speed;

    let outcome = loop {
        let step = env.step_action(policy.act(&obs));
        obs = step.obs;
        top_speed = top_speed.max(env.state().speed);
        for (end, at) in ends.iter().zip(crossed.iter_mut()) {
            if at.is_none() && env.progress() + 0.5 >= *end {
                *at = Some(env.elapsed());
            }
        }
        if let Some(outcome) = step.outcome {
            break outcome;
        }
    };

    let mut sector_times = Vec::with_capacity(sectors);
    let mut previous = (0.0, Some(0.0));
    for (index, (&end, &at)) in ends.iter().zip(&crossed).enumerate() {
        let (sector_start, started_at) = previous;
        let reference = reference_between(&track, start + sector_start, end - sector_start);
        let time = at.zip(started_at).map(|(t1, t0)| t1 - t0);
        sector_times.push(SectorTime {
            index,
            start: sector_start,
            end,
            time,
            reference,
            delta: time.map(|t| t - reference),
        });
        previous = (end, at);
    }

    let distance = env.progress().max(0.0);
    let elapsed = env.elapsed();
    let reference_time = reference_between(&track, start, distance);
    let comparison = LapComparison {
        track: track.name().to_string(),
        outcome,
        lap_time: (outcome == Outcome::LapComplete).then_some(elapsed),
        distance,
        elapsed,
        reference_time,
        delta: elapsed - reference_time,
        sectors: sector_times,
        top_speed_kmh: top_speed * 3.6,
        average_speed_kmh: if elapsed > 0.0 { distance / elapsed * 3.6 } else { 0.0 },
        steps: env.steps(),
    };
    debug!(
        %outcome,
        distance,
        elapsed,
        delta = comparison.delta,
        "lap evaluated"
    );
    comparison
}
