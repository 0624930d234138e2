//! Reference telemetry ingest.
//!
//! A lap of reference telemetry seeds the racing line: positions become the
//! centreline, recorded speeds become the reference speed profile, and turns
//! are found from braking zones and local speed minima.

use crate::error::{invalid, TrackError};
use crate::geometry::{PointDescription, TrackDescription};
use crate::turn::{Turn, TurnDirection};
use physics::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Samples on each side of a candidate apex that must not be slower.
const APEX_WINDOW: usize = 20;
/// km/h; faster minima are kinks, not turns.
const APEX_MAX_SPEED: f32 = 150.0;
/// Brake percentage above which a sample counts as braking.
const BRAKE_ON: f32 = 5.0;
/// Meters an apex may trail the end of its braking zone.
const ZONE_SLACK: f32 = 100.0;
/// Throttle percentage that marks the turn exit.
const EXIT_THROTTLE: f32 = 90.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub x: f32,
    pub y: f32,
    /// km/h
    pub speed: f32,
    /// Percent.
    pub throttle: f32,
    /// Percent.
    pub brake: f32,
    #[serde(default)]
    pub distance: Option<f32>,
    /// Seconds from the start of the lap.
    #[serde(default)]
    pub time: f32,
}

impl TelemetrySample {
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Read a JSON array of samples.
///
/// # Errors
///
/// I/O or JSON failure.
pub fn load_samples(path: &Path) -> Result<Vec<TelemetrySample>, TrackError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Distance along the lap for every sample: the recorded value when every
/// sample carries one, otherwise the cumulative path length.
#[must_use]
pub fn sample_distances(samples: &[TelemetrySample]) -> Vec<f32> {
    if !samples.is_empty() && samples.iter().all(|s| s.distance.is_some()) {
        let start = samples[0].distance.unwrap_or(0.0);
        return samples.iter().map(|s| s.distance.unwrap_or(0.0) - start).collect();
    }
    let mut total = 0.0;
    let mut out = Vec::with_capacity(samples.len());
    for (i, s) in samples.iter().enumerate() {
        if i > 0 {
            total += s.position().distance(samples[i - 1].position());
        }
        out.push(total);
    }
    out
}

struct BrakingZone {
    start: usize,
    end: usize,
}

fn braking_zones(samples: &[TelemetrySample]) -> Vec<BrakingZone> {
    let braking = |i: usize| samples[i].brake > BRAKE_ON;
    let mut zones = Vec::new();
    for i in 0..samples.len() {
        if braking(i) && (i == 0 || !braking(i - 1)) {
            if let Some(end) = (i + 1..samples.len()).find(|&j| !braking(j)) {
                zones.push(BrakingZone { start: i, end });
            }
        }
    }
    zones
}

fn apexes(samples: &[TelemetrySample]) -> Vec<usize> {
    let mut out = Vec::new();
    if samples.len() <= 2 * APEX_WINDOW {
        return out;
    }
    let mut previous: Option<usize> = None;
    for i in APEX_WINDOW..samples.len() - APEX_WINDOW {
        let speed = samples[i].speed;
        let window_min = samples[i - APEX_WINDOW..i + APEX_WINDOW]
            .iter()
            .map(|s| s.speed)
            .fold(f32::INFINITY, f32::min);
        if speed <= window_min && speed > 0.0 && speed < APEX_MAX_SPEED {
            // a flat minimum reports its first sample only
            let plateau = previous.is_some_and(|p| p + 1 == i && samples[p].speed == speed);
            if !plateau {
                out.push(i);
            }
            previous = Some(i);
        }
    }
    out
}

/// Turns found in a lap of telemetry.
///
/// An apex is a sample slower than everything within [`APEX_WINDOW`] samples
/// either side and below 150 km/h. It becomes a turn when a braking zone
/// starts before it and ends no more than 100 m before it; each zone serves
/// one turn. The exit is the first later sample at 90 % throttle or more.
#[must_use]
pub fn detect_turns(samples: &[TelemetrySample], distances: &[f32]) -> Vec<Turn> {
    let zones = braking_zones(samples);
    let mut used = vec![false; zones.len()];
    let mut turns = Vec::new();
    let last = samples.len().saturating_sub(1);

    for apex in apexes(samples) {
        let at = distances[apex];
        let Some(z) = zones
            .iter()
            .enumerate()
            .position(|(k, z)| !used[k] && distances[z.start] < at && at < distances[z.end] + ZONE_SLACK)
        else {
            continue;
        };
        used[z] = true;

        let exit = (apex + 1..samples.len())
            .find(|&k| samples[k].throttle >= EXIT_THROTTLE)
            .unwrap_or((apex + APEX_WINDOW).min(last));
        let (a, b, c) = (
            samples[apex.saturating_sub(2)].position(),
            samples[apex].position(),
            samples[(apex + 2).min(last)].position(),
        );
        let number = u32::try_from(turns.len() + 1).unwrap_or(u32::MAX);
        turns.push(Turn {
            number,
            name: format!("T{number}"),
            brake_distance: distances[zones[z].start],
            apex_distance: at,
            apex_speed: samples[apex].speed,
            exit_distance: distances[exit],
            exit_speed: samples[exit].speed,
            direction: TurnDirection::from_curvature((b - a).cross(c - b)),
        });
    }
    debug!(zones = zones.len(), turns = turns.len(), "turns detected from telemetry");
    turns
}

/// Build a track description from a lap of reference telemetry.
///
/// Samples that repeat the previous position are dropped. Every point gets
/// `half_width` on both sides.
///
/// # Errors
///
/// [`TrackError::InvalidTrackData`] when fewer than three distinct samples
/// remain.
pub fn description_from_telemetry(
    name: &str,
    samples: &[TelemetrySample],
    half_width: f32,
) -> Result<TrackDescription, TrackError> {
    let mut kept: Vec<TelemetrySample> = Vec::with_capacity(samples.len());
    for s in samples {
        if kept.last().map_or(true, |prev| prev.position().distance(s.position()) >= 1e-3) {
            kept.push(s.clone());
        }
    }
    if kept.len() < 3 {
        return Err(invalid(format!("{} distinct telemetry samples; at least 3 are required", kept.len())));
    }
    let distances = sample_distances(&kept);
    let turns = detect_turns(&kept, &distances);

    let points = kept
        .iter()
        .zip(&distances)
        .map(|(s, &d)| PointDescription {
            x: s.x,
            y: s.y,
            distance: Some(d),
            left_width: half_width,
            right_width: half_width,
            speed: (s.speed > 0.0).then_some(s.speed),
        })
        .collect();

    Ok(TrackDescription { name: name.to_string(), points, turns, closed: None })
}
