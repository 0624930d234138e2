//! Quantized scenario keys and the grid they are sampled on.

use crate::error::ScenarioError;
use physics::{CarState, TireCompound, Weather};
use serde::{Deserialize, Serialize};
use std::fmt;
use track::TrackGeometry;

/// Resolution of the compiled state space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingGrid {
    /// Meters between position buckets.
    pub position_step: f32,
    pub speed_min_kmh: f32,
    pub speed_max_kmh: f32,
    pub speed_step_kmh: f32,
    pub compounds: Vec<TireCompound>,
    pub weather: Vec<Weather>,
    /// Upper bound of the per-sample tire wear drawn from the seed.
    pub max_wear: f32,
}

impl Default for SamplingGrid {
    fn default() -> Self {
        Self {
            position_step: 5.0,
            speed_min_kmh: 60.0,
            speed_max_kmh: 320.0,
            speed_step_kmh: 10.0,
            compounds: TireCompound::ALL.to_vec(),
            weather: Weather::ALL.to_vec(),
            max_wear: 0.4,
        }
    }
}

impl SamplingGrid {
    /// # Errors
    ///
    /// [`ScenarioError::InvalidGrid`] for non-positive steps, an inverted
    /// speed range, an empty category list or wear outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.position_step) {
            return Err(ScenarioError::InvalidGrid(format!("position step {}", self.position_step)));
        }
        if !positive(self.speed_step_kmh) {
            return Err(ScenarioError::InvalidGrid(format!("speed step {}", self.speed_step_kmh)));
        }
        if !(self.speed_min_kmh.is_finite() && self.speed_min_kmh >= 0.0)
            || !self.speed_max_kmh.is_finite()
            || self.speed_max_kmh < self.speed_min_kmh
        {
            return Err(ScenarioError::InvalidGrid(format!(
                "speed range {}..{} km/h",
                self.speed_min_kmh, self.speed_max_kmh
            )));
        }
        if self.compounds.is_empty() || self.weather.is_empty() {
            return Err(ScenarioError::InvalidGrid("no compounds or weather classes".into()));
        }
        if !(0.0..=1.0).contains(&self.max_wear) {
            return Err(ScenarioError::InvalidGrid(format!("max wear {}", self.max_wear)));
        }
        Ok(())
    }

    /// Position buckets covering `[0, length)`.
    #[must_use]
    pub fn position_buckets(&self, length: f32) -> u32 {
        (length / self.position_step).ceil().max(1.0) as u32
    }

    #[must_use]
    pub fn speed_buckets(&self) -> u32 {
        ((self.speed_max_kmh - self.speed_min_kmh) / self.speed_step_kmh + 1e-3).floor() as u32 + 1
    }

    #[must_use]
    pub fn position_of(&self, bucket: u32) -> f32 {
        bucket as f32 * self.position_step
    }

    #[must_use]
    pub fn speed_of(&self, bucket: u32) -> f32 {
        self.speed_min_kmh + bucket as f32 * self.speed_step_kmh
    }

    /// Continuous bucket coordinates; a key's coordinates are its bucket
    /// indices.
    #[must_use]
    pub fn coordinates(&self, distance: f32, speed_kmh: f32) -> [f32; 2] {
        [distance / self.position_step, (speed_kmh - self.speed_min_kmh) / self.speed_step_kmh]
    }

    /// The bucket a query falls into.
    #[must_use]
    pub fn key_for(&self, query: &LiveQuery) -> ScenarioKey {
        let [p, s] = self.coordinates(query.distance, query.speed_kmh);
        ScenarioKey {
            compound: query.compound,
            weather: query.weather,
            position: p.round().max(0.0) as u32,
            speed: s.round().max(0.0) as u32,
        }
    }
}

/// Bucketed scenario coordinates. Ordering groups keys by partition, then
/// position, then speed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub compound: TireCompound,
    pub weather: Weather,
    pub position: u32,
    pub speed: u32,
}

impl ScenarioKey {
    #[must_use]
    pub fn coordinates(&self) -> [f32; 2] {
        [self.position as f32, self.speed as f32]
    }

    #[must_use]
    pub fn partition(&self) -> (TireCompound, Weather) {
        (self.compound, self.weather)
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/p{}/v{}", self.compound, self.weather, self.position, self.speed)
    }
}

/// Live situation to look up, in the same dimensions the database was
/// compiled over.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveQuery {
    /// Meters along the racing line.
    pub distance: f32,
    pub speed_kmh: f32,
    pub compound: TireCompound,
    pub weather: Weather,
}

impl LiveQuery {
    #[must_use]
    pub fn new(distance: f32, speed_kmh: f32, compound: TireCompound, weather: Weather) -> Self {
        Self { distance, speed_kmh, compound, weather }
    }

    /// Derive the query from a car state by projecting it onto the line.
    #[must_use]
    pub fn from_state(state: &CarState, track: &TrackGeometry, weather: Weather) -> Self {
        Self {
            distance: track.project(state.position).distance,
            speed_kmh: state.speed_kmh(),
            compound: state.compound,
            weather,
        }
    }

    /// The query sitting exactly on `key`.
    #[must_use]
    pub fn at_key(key: &ScenarioKey, grid: &SamplingGrid) -> Self {
        Self {
            distance: grid.position_of(key.position),
            speed_kmh: grid.speed_of(key.speed),
            compound: key.compound,
            weather: key.weather,
        }
    }
}
