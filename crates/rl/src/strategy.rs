//! # Pit strategy
//!
//! Stint degradation comes from the tyre model in [`physics::tire`]. Every
//! lap adds the wear a corner accumulates over the track length at a
//! nominal friction utilisation, and the grip left after that wear sets the
//! lap time through the grip-limited share of the lap. Pit windows, the
//! undercut and overcut, the per-lap pit call and backtests against a
//! recorded race are all built on that lap-time model.
//!
//! ```rust
//! use physics::TireCompound;
//! use rl::{EnvConfig, StintModel, StrategyConfig};
//!
//! let track = track::reference_circuit()?;
//! let model = StintModel::for_track(&track, &EnvConfig::default(), StrategyConfig::default())?;
//! let soft = model.optimal_stint_length(TireCompound::Soft);
//! let hard = model.optimal_stint_length(TireCompound::Hard);
//! assert!(soft < hard);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::TrainError;
use crate::racing::EnvConfig;
use physics::{tire, TireCompound, TireParams, Weather};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use track::TrackGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Seconds a stop costs, pit lane included.
    pub pit_loss: f32,
    /// Fraction of the friction circle in use, averaged over a lap.
    pub utilisation: f32,
    /// Multiplier on the per-meter wear rates over a race distance.
    pub wear_scale: f32,
    /// Fraction of the lap time that scales with grip.
    pub grip_limited_share: f32,
    /// Seconds gained per lap as fuel burns off.
    pub fuel_gain_per_lap: f32,
    /// Pace loss in seconds that ends a stint.
    pub degradation_threshold: f32,
    pub max_stint_laps: u32,
    /// Stops are searched this many laps ahead.
    pub window_span: u32,
    /// No stop is planned in the closing laps.
    pub closing_laps: u32,
    /// A window this many laps away or closer means pit now.
    pub pit_now_within: u32,
    /// Sets younger than this are not swapped for the same compound.
    pub min_life_to_repeat: u32,
    pub critical_tire_life: u32,
    pub critical_pace_loss: f32,
    pub undercut_gap: f32,
    pub undercut_min_life: u32,
    /// Laps the car ahead is assumed to have run beyond our own set.
    pub undercut_opponent_extra_life: u32,
    /// Seconds an undercut must promise.
    pub undercut_margin: f32,
    /// Share of the pit loss charged against the first lap after an undercut.
    pub undercut_pit_share: f32,
    pub neutralised_compound: TireCompound,
    /// Seconds a stop saves under yellow flags or a safety car.
    pub neutralised_time_gain: f32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            pit_loss: 24.0,
            utilisation: 0.6,
            wear_scale: 0.1,
            grip_limited_share: 0.6,
            fuel_gain_per_lap: 0.03,
            degradation_threshold: 2.0,
            max_stint_laps: 50,
            window_span: 20,
            closing_laps: 5,
            pit_now_within: 2,
            min_life_to_repeat: 5,
            critical_tire_life: 25,
            critical_pace_loss: 1.5,
            undercut_gap: 2.5,
            undercut_min_life: 10,
            undercut_opponent_extra_life: 5,
            undercut_margin: 0.3,
            undercut_pit_share: 0.1,
            neutralised_compound: TireCompound::Medium,
            neutralised_time_gain: 15.0,
        }
    }
}

impl StrategyConfig {
    /// # Errors
    ///
    /// [`TrainError::Strategy`] naming the first unusable field.
    pub fn validate(&self) -> Result<(), TrainError> {
        let fail = |msg: String| Err(TrainError::Strategy(msg));
        if !(self.pit_loss.is_finite() && self.pit_loss >= 0.0) {
            return fail(format!("pit loss {} must be a non-negative number of seconds", self.pit_loss));
        }
        if !(0.0..=1.0).contains(&self.utilisation) {
            return fail(format!("utilisation {} must lie in [0, 1]", self.utilisation));
        }
        if !(self.wear_scale.is_finite() && self.wear_scale > 0.0) {
            return fail(format!("wear scale {} must be positive", self.wear_scale));
        }
        if !(0.0..=1.0).contains(&self.grip_limited_share) {
            return fail(format!("grip-limited share {} must lie in [0, 1]", self.grip_limited_share));
        }
        if !self.fuel_gain_per_lap.is_finite() || !self.degradation_threshold.is_finite() {
            return fail("fuel gain and degradation threshold must be finite".into());
        }
        if self.max_stint_laps == 0 {
            return fail("a stint must allow at least one lap".into());
        }
        Ok(())
    }
}

/// Whether the race is running under green flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    Green,
    Yellow,
    SafetyCar,
}

impl TrackStatus {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::SafetyCar => "safety_car",
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "green" | "1" => Ok(Self::Green),
            "yellow" | "2" => Ok(Self::Yellow),
            "safety_car" | "sc" | "4" => Ok(Self::SafetyCar),
            _ => Err(format!("unknown track status `{s}`")),
        }
    }
}

/// One car's situation at the start of a lap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    pub current_lap: u32,
    pub total_laps: u32,
    pub position: u32,
    pub compound: TireCompound,
    /// Laps run on the current set.
    pub tire_life: u32,
    /// Seconds to the car ahead.
    pub gap_ahead: f32,
    /// Seconds to the car behind.
    pub gap_behind: f32,
    #[serde(default)]
    pub track_status: TrackStatus,
}

/// Predicted pace of one lap of a stint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StintLap {
    pub tire_life: u32,
    /// Mean corner wear at the start of the lap.
    pub wear: f32,
    pub grip: f32,
    pub lap_time: f32,
    /// Seconds slower than the first lap on the set.
    pub delta: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StintForecast {
    pub compound: TireCompound,
    pub wear_per_lap: f32,
    pub optimal_length: u32,
    pub laps: Vec<StintLap>,
}

/// The best single stop within the search window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitWindow {
    /// `None` when no lap of the window allows a stop.
    pub pit_lap: Option<u32>,
    pub compound: Option<TireCompound>,
    /// Seconds to the flag with the stop.
    pub total_time: Option<f32>,
    /// Seconds to the flag without stopping.
    pub baseline_time: f32,
    /// `baseline_time - total_time`; negative when staying out is faster.
    pub time_saved: Option<f32>,
}

impl PitWindow {
    /// The window's stop, if it beats staying out.
    #[must_use]
    pub fn worthwhile(&self) -> Option<(u32, TireCompound, f32)> {
        match (self.pit_lap, self.compound, self.time_saved) {
            (Some(lap), Some(compound), Some(saved)) if saved > 0.0 => Some((lap, compound, saved)),
            _ => None,
        }
    }
}

/// Why a pit call came out the way it did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// The field is neutralised, so a stop costs less than usual.
    Neutralised { status: TrackStatus },
    PitWindow { lap: u32, time_saved: f32 },
    Degradation { pace_loss: f32 },
    Undercut { advantage: f32 },
    StayOut { window_in: Option<u32>, tire_life: u32 },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neutralised { status } => write!(f, "track is {status}: stop costs less than under green"),
            Self::PitWindow { lap, time_saved } => write!(f, "pit window at lap {lap} saves {time_saved:.2}s"),
            Self::Degradation { pace_loss } => write!(f, "tyres are {pace_loss:.2}s/lap off fresh pace"),
            Self::Undercut { advantage } => write!(f, "undercut on the car ahead is worth {advantage:.2}s"),
            Self::StayOut { window_in: Some(n), tire_life } => {
                write!(f, "stay out: window in {n} laps, tyres {tire_life} laps old")
            }
            Self::StayOut { window_in: None, tire_life } => {
                write!(f, "stay out: no stop beats running to the flag, tyres {tire_life} laps old")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitDecision {
    pub should_pit: bool,
    /// In `[0, 1]`.
    pub confidence: f32,
    /// Negative is places lost.
    pub expected_position_change: i32,
    /// Seconds gained by stopping now; zero when staying out.
    pub expected_time_delta: f32,
    pub recommended_compound: TireCompound,
    pub reasoning: Vec<Reason>,
    /// The window's stop when the call is to stay out.
    pub alternative_lap: Option<u32>,
}

/// One lap of a recorded race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricLap {
    pub driver: String,
    pub lap: u32,
    pub stint: u32,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub compound: Option<TireCompound>,
    #[serde(default)]
    pub tire_life: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitCall {
    pub lap: u32,
    pub confidence: f32,
    pub compound: TireCompound,
    pub reasoning: Vec<Reason>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub driver: String,
    pub total_laps: u32,
    pub actual_pit_laps: Vec<u32>,
    pub calls: Vec<PitCall>,
    /// Fraction of the actual stops the model called on the same lap.
    pub agreement_rate: f32,
}

/// Lap times over a stint, from the tyre wear and grip model.
#[derive(Clone, Debug, PartialEq)]
pub struct StintModel {
    tires: TireParams,
    weather: Weather,
    track_length: f32,
    /// Seconds for a lap on fresh softs in the dry at full fuel.
    base_lap_time: f32,
    config: StrategyConfig,
}

impl StintModel {
    /// # Errors
    ///
    /// An unusable configuration, track length or base lap time.
    pub fn new(
        tires: TireParams,
        weather: Weather,
        track_length: f32,
        base_lap_time: f32,
        config: StrategyConfig,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        if !(track_length.is_finite() && track_length > 0.0) {
            return Err(TrainError::Strategy(format!("track length {track_length} must be positive")));
        }
        if !(base_lap_time.is_finite() && base_lap_time > 0.0) {
            return Err(TrainError::Strategy(format!("base lap time {base_lap_time} must be positive")));
        }
        Ok(Self { tires, weather, track_length, base_lap_time, config })
    }

    /// Paced from the track's reference lap, with the car and weather of `env`.
    ///
    /// # Errors
    ///
    /// See [`StintModel::new`].
    pub fn for_track(track: &TrackGeometry, env: &EnvConfig, config: StrategyConfig) -> Result<Self, TrainError> {
        Self::new(env.car.tires.clone(), env.weather, track.length(), track.reference_lap_time(), config)
    }

    /// The same model re-paced so that a fresh set of `compound` laps in
    /// `lap_time` seconds.
    ///
    /// # Errors
    ///
    /// A lap time that is not a positive number of seconds.
    pub fn paced_by(&self, lap_time: f32, compound: TireCompound) -> Result<Self, TrainError> {
        let base = lap_time / self.pace_factor(compound, 0);
        Self::new(self.tires.clone(), self.weather, self.track_length, base, self.config.clone())
    }

    #[must_use]
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    #[must_use]
    pub fn wear_per_lap(&self, compound: TireCompound) -> f32 {
        let spec = self.tires.spec(compound);
        tire::wear_increment(spec, 0.25, self.config.utilisation, self.track_length) * self.config.wear_scale
    }

    /// Wear at the start of lap `tire_life` of a stint. Laps 0 and 1 are fresh.
    #[must_use]
    pub fn wear_at(&self, compound: TireCompound, tire_life: u32) -> f32 {
        (self.wear_per_lap(compound) * tire_life.saturating_sub(1) as f32).min(1.0)
    }

    /// Grip inside the compound's operating window.
    #[must_use]
    pub fn grip(&self, compound: TireCompound, wear: f32) -> f32 {
        let spec = self.tires.spec(compound);
        let temp = 0.5 * (spec.window_low + spec.window_high);
        tire::grip_coefficient(spec, &self.tires, wear, temp) * self.weather.grip_factor()
    }

    /// Lap time relative to fresh softs in the dry.
    #[must_use]
    pub fn pace_factor(&self, compound: TireCompound, tire_life: u32) -> f32 {
        let reference = self.tires.soft.base_grip;
        let grip = self.grip(compound, self.wear_at(compound, tire_life)).max(1e-3);
        let share = self.config.grip_limited_share;
        (1.0 - share) + share * (reference / grip).sqrt()
    }

    /// Seconds for race lap `race_lap` on a set `tire_life` laps old.
    #[must_use]
    pub fn lap_time(&self, compound: TireCompound, tire_life: u32, race_lap: u32) -> f32 {
        let fuel = self.config.fuel_gain_per_lap * race_lap.saturating_sub(1) as f32;
        (self.base_lap_time * self.pace_factor(compound, tire_life) - fuel).max(0.0)
    }

    /// Lap-by-lap pace of a set over its first `max_laps` laps, fuel excluded.
    #[must_use]
    pub fn predict_stint(&self, compound: TireCompound, max_laps: u32) -> Vec<StintLap> {
        let fresh = self.lap_time(compound, 1, 1);
        (1..=max_laps)
            .map(|life| {
                let wear = self.wear_at(compound, life);
                let lap_time = self.lap_time(compound, life, 1);
                StintLap { tire_life: life, wear, grip: self.grip(compound, wear), lap_time, delta: lap_time - fresh }
            })
            .collect()
    }

    /// First tyre life whose lap is more than the degradation threshold off
    /// the fresh pace, or the stint cap when none is.
    #[must_use]
    pub fn optimal_stint_length(&self, compound: TireCompound) -> u32 {
        self.predict_stint(compound, self.config.max_stint_laps)
            .iter()
            .find(|lap| lap.delta > self.config.degradation_threshold)
            .map_or(self.config.max_stint_laps, |lap| lap.tire_life)
    }

    #[must_use]
    pub fn forecast(&self, compound: TireCompound) -> StintForecast {
        StintForecast {
            compound,
            wear_per_lap: self.wear_per_lap(compound),
            optimal_length: self.optimal_stint_length(compound),
            laps: self.predict_stint(compound, self.config.max_stint_laps),
        }
    }

    /// Seconds from the start of the current lap to the flag, stopping at
    /// the start of `stop.0` for a set of `stop.1`.
    #[must_use]
    pub fn time_to_finish(&self, state: &RaceState, stop: Option<(u32, TireCompound)>) -> f32 {
        let mut compound = state.compound;
        let mut life = state.tire_life;
        let mut total = 0.0;
        for lap in state.current_lap..=state.total_laps {
            if let Some((pit_lap, fitted)) = stop {
                if lap == pit_lap {
                    total += self.config.pit_loss;
                    compound = fitted;
                    life = 0;
                }
            }
            life += 1;
            total += self.lap_time(compound, life, lap);
        }
        total
    }

    /// Best single stop among `compounds` within the search window.
    #[must_use]
    pub fn find_pit_window(&self, state: &RaceState, compounds: &[TireCompound]) -> PitWindow {
        let baseline_time = self.time_to_finish(state, None);
        let first = state.current_lap + 1;
        let last = (state.current_lap + self.config.window_span).min(state.total_laps.saturating_sub(self.config.closing_laps));
        let mut best: Option<(u32, TireCompound, f32)> = None;
        for lap in first..last {
            for &compound in compounds {
                if compound == state.compound && state.tire_life < self.config.min_life_to_repeat {
                    continue;
                }
                let total = self.time_to_finish(state, Some((lap, compound)));
                if best.map_or(true, |(_, _, t)| total < t) {
                    best = Some((lap, compound, total));
                }
            }
        }
        let window = PitWindow {
            pit_lap: best.map(|b| b.0),
            compound: best.map(|b| b.1),
            total_time: best.map(|b| b.2),
            baseline_time,
            time_saved: best.map(|b| baseline_time - b.2),
        };
        debug!(lap = state.current_lap, pit_lap = ?window.pit_lap, saved = ?window.time_saved, "pit window searched");
        window
    }

    /// Seconds gained on a car running `opponent_life` laps old tyres by
    /// stopping now. Positive favours the undercut.
    #[must_use]
    pub fn undercut_advantage(&self, state: &RaceState, opponent_life: u32) -> f32 {
        let fresh = self.lap_time(state.compound, 1, state.current_lap);
        let old = self.lap_time(state.compound, opponent_life, state.current_lap);
        (old - fresh) - self.config.pit_loss * self.config.undercut_pit_share
    }

    /// Seconds gained by staying out `extra_laps` more while a rival on the
    /// same compound stops now. Positive favours the overcut.
    #[must_use]
    pub fn overcut_advantage(&self, state: &RaceState, extra_laps: u32) -> f32 {
        let staying: f32 = (0..extra_laps)
            .map(|i| self.lap_time(state.compound, state.tire_life + i + 1, state.current_lap + i))
            .sum();
        let stopping: f32 = (0..extra_laps).map(|i| self.lap_time(state.compound, i + 1, state.current_lap + i)).sum();
        stopping + self.config.pit_loss - staying
    }

    /// The pit call for the coming lap.
    #[must_use]
    pub fn make_decision(&self, state: &RaceState) -> PitDecision {
        let config = &self.config;
        if state.track_status != TrackStatus::Green {
            return PitDecision {
                should_pit: true,
                confidence: 0.95,
                expected_position_change: 0,
                expected_time_delta: config.neutralised_time_gain,
                recommended_compound: config.neutralised_compound,
                reasoning: vec![Reason::Neutralised { status: state.track_status }],
                alternative_lap: None,
            };
        }

        let window = self.find_pit_window(state, &TireCompound::ALL);
        let worthwhile = window.worthwhile();
        let call = worthwhile
            .filter(|(lap, _, _)| lap - state.current_lap <= config.pit_now_within)
            .map(|(lap, _, saved)| (0.9, Reason::PitWindow { lap, time_saved: saved }))
            .or_else(|| {
                let pace_loss = self.lap_time(state.compound, state.tire_life, state.current_lap)
                    - self.lap_time(state.compound, 1, state.current_lap);
                (state.tire_life > config.critical_tire_life && pace_loss > config.critical_pace_loss)
                    .then_some((0.8, Reason::Degradation { pace_loss }))
            })
            .or_else(|| {
                if state.gap_ahead >= config.undercut_gap || state.tire_life <= config.undercut_min_life {
                    return None;
                }
                let advantage =
                    self.undercut_advantage(state, state.tire_life + config.undercut_opponent_extra_life);
                (advantage > config.undercut_margin).then_some((0.75, Reason::Undercut { advantage }))
            });

        let recommended_compound = window.compound.unwrap_or(config.neutralised_compound);
        match call {
            Some((confidence, reason)) => PitDecision {
                should_pit: true,
                confidence,
                expected_position_change: if state.gap_behind < config.pit_loss { -1 } else { 0 },
                expected_time_delta: worthwhile.map_or(0.0, |(_, _, saved)| saved),
                recommended_compound,
                reasoning: vec![reason],
                alternative_lap: None,
            },
            None => PitDecision {
                should_pit: false,
                confidence: 0.0,
                expected_position_change: 0,
                expected_time_delta: 0.0,
                recommended_compound,
                reasoning: vec![Reason::StayOut {
                    window_in: worthwhile.map(|(lap, _, _)| lap - state.current_lap),
                    tire_life: state.tire_life,
                }],
                alternative_lap: window.pit_lap,
            },
        }
    }

    /// Replay `driver`'s recorded race lap by lap and compare the pit calls
    /// with the stops actually made. Gaps are not recorded, so both are
    /// taken as 1.5 s under green flags.
    ///
    /// # Errors
    ///
    /// [`TrainError::Strategy`] when `laps` holds nothing for `driver`.
    pub fn backtest(&self, driver: &str, laps: &[HistoricLap]) -> Result<BacktestReport, TrainError> {
        let mut own: Vec<&HistoricLap> = laps.iter().filter(|l| l.driver == driver).collect();
        if own.is_empty() {
            return Err(TrainError::Strategy(format!("no laps recorded for driver {driver}")));
        }
        own.sort_by_key(|l| l.lap);
        let total_laps = own.iter().map(|l| l.lap).max().unwrap_or(0);
        let actual_pit_laps: Vec<u32> =
            own.windows(2).filter(|pair| pair[0].stint != pair[1].stint).map(|pair| pair[1].lap).collect();

        let calls: Vec<PitCall> = own
            .iter()
            .filter_map(|lap| {
                let state = RaceState {
                    current_lap: lap.lap,
                    total_laps,
                    position: lap.position.unwrap_or(10),
                    compound: lap.compound.unwrap_or(TireCompound::Medium),
                    tire_life: lap.tire_life.unwrap_or(1),
                    gap_ahead: 1.5,
                    gap_behind: 1.5,
                    track_status: TrackStatus::Green,
                };
                let decision = self.make_decision(&state);
                decision.should_pit.then(|| PitCall {
                    lap: lap.lap,
                    confidence: decision.confidence,
                    compound: decision.recommended_compound,
                    reasoning: decision.reasoning,
                })
            })
            .collect();

        let called: BTreeSet<u32> = calls.iter().map(|c| c.lap).collect();
        let actual: BTreeSet<u32> = actual_pit_laps.iter().copied().collect();
        let agreement_rate = called.intersection(&actual).count() as f32 / actual.len().max(1) as f32;
        info!(driver, total_laps, stops = actual.len(), calls = calls.len(), agreement_rate, "race backtested");
        Ok(BacktestReport { driver: driver.to_string(), total_laps, actual_pit_laps, calls, agreement_rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> StintModel {
        StintModel::new(TireParams::default(), Weather::Dry, 5000.0, 90.0, StrategyConfig::default()).unwrap()
    }

    #[test]
    fn fresh_softs_in_the_dry_run_the_base_lap() {
        let model = model();
        assert!((model.lap_time(TireCompound::Soft, 1, 1) - 90.0).abs() < 1e-3);
        assert!(model.lap_time(TireCompound::Hard, 1, 1) > model.lap_time(TireCompound::Soft, 1, 1));
    }

    #[test]
    fn fuel_burn_makes_later_laps_quicker() {
        let model = model();
        let early = model.lap_time(TireCompound::Medium, 1, 1);
        let late = model.lap_time(TireCompound::Medium, 1, 41);
        assert!((early - late - 40.0 * 0.03).abs() < 1e-3);
    }

    #[test]
    fn rain_slows_every_compound() {
        let dry = model();
        let wet = StintModel::new(TireParams::default(), Weather::Wet, 5000.0, 90.0, StrategyConfig::default()).unwrap();
        for compound in TireCompound::ALL {
            assert!(wet.lap_time(compound, 1, 1) > dry.lap_time(compound, 1, 1));
        }
    }

    #[test]
    fn repacing_keeps_the_shape_of_the_stint() {
        let model = model();
        let paced = model.paced_by(80.0, TireCompound::Medium).unwrap();
        assert!((paced.lap_time(TireCompound::Medium, 1, 1) - 80.0).abs() < 1e-3);
        assert!(paced.optimal_stint_length(TireCompound::Medium) >= model.optimal_stint_length(TireCompound::Medium));
        assert!(model.paced_by(f32::NAN, TireCompound::Soft).is_err());
    }

    #[test]
    fn status_parses_timing_codes() {
        assert_eq!("4".parse::<TrackStatus>().unwrap(), TrackStatus::SafetyCar);
        assert_eq!("safety-car".parse::<TrackStatus>().unwrap(), TrackStatus::SafetyCar);
        assert_eq!("GREEN".parse::<TrackStatus>().unwrap(), TrackStatus::Green);
        assert!("red".parse::<TrackStatus>().is_err());
    }

    #[test]
    fn reasons_read_as_sentences() {
        let text = Reason::PitWindow { lap: 12, time_saved: 3.456 }.to_string();
        assert_eq!(text, "pit window at lap 12 saves 3.46s");
        let json = serde_json::to_string(&Reason::Undercut { advantage: 0.5 }).unwrap();
        assert!(json.contains("\"kind\":\"undercut\""));
    }
}
