//! Physics validation against recorded telemetry.

use physics::{Action, CarDynamics, CarState, PhysicsError, TireCompound, Vec2};
use serde::{Deserialize, Serialize};
use track::telemetry::TelemetrySample;

/// Longest interval, in seconds, one sample's inputs are held for.
pub const MAX_SAMPLE_GAP: f32 = 5.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedTraceReport {
    /// Samples compared, the first excluded.
    pub samples: usize,
    pub rmse_kmh: f32,
    pub max_error_kmh: f32,
    /// Mean signed error; positive when the model is faster.
    pub bias_kmh: f32,
    /// Simulated seconds.
    pub duration: f32,
}

/// Replay the recorded throttle and brake through the physics model and
/// compare the predicted speed with the recorded one.
///
/// The replay is longitudinal only: steering stays centred and the model
/// runs open loop from the first sample's speed. Each sample's inputs are
/// held until the next sample's timestamp. When timestamps do not advance,
/// or jump by more than [`MAX_SAMPLE_GAP`], the gap is estimated from the
/// distance between the samples, and it never exceeds [`MAX_SAMPLE_GAP`].
///
/// # Errors
///
/// Propagates [`PhysicsError`] from the model.
pub fn validate_speed_trace(
    samples: &[TelemetrySample],
    dynamics: &CarDynamics,
    compound: TireCompound,
    dt: f32,
) -> Result<SpeedTraceReport, PhysicsError> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(PhysicsError::InvalidTimestep(dt));
    }
    let Some(first) = samples.first() else {
        return Ok(SpeedTraceReport::default());
    };
    let mut state = CarState::new(Vec2::ZERO, 0.0, first.speed / 3.6, compound);
    let mut report = SpeedTraceReport::default();
    let mut squared = 0.0;
    let mut signed = 0.0;

    for pair in samples.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let mut gap = to.time - from.time;
        if !(gap.is_finite() && gap > 0.0 && gap <= MAX_SAMPLE_GAP) {
            let mean_speed = 0.5 * (from.speed + to.speed) / 3.6;
            gap = if mean_speed > 0.1 { from.position().distance(to.position()) / mean_speed } else { dt };
        }
        let gap = if gap.is_finite() { gap.min(MAX_SAMPLE_GAP).max(dt) } else { dt };
        let ticks = (gap / dt).round().max(1.0) as usize;
        let action = Action::new(from.throttle, from.brake, 0.0);
        for _ in 0..ticks {
            state = dynamics.step(&state, &action, dt)?.state;
        }

        let error = state.speed * 3.6 - to.speed;
        squared += error * error;
        signed += error;
        report.max_error_kmh = report.max_error_kmh.max(error.abs());
        report.samples += 1;
    }

    if report.samples > 0 {
        let n = report.samples as f32;
        report.rmse_kmh = (squared / n).sqrt();
        report.bias_kmh = signed / n;
    }
    report.duration = state.elapsed;
    Ok(report)
}
