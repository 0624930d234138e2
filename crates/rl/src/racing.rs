//! Episodic racing environment over a [`TrackGeometry`].

use crate::env::{Env, Outcome, Step};
use crate::error::TrainError;
use physics::{wrap_angle, Action, CarDynamics, CarParams, CarState, TireCompound, Vec2, Weather, CORNERS};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::debug;
use track::{Projection, TrackGeometry, DEFAULT_HORIZON, FEATURES_PER_TURN};

/// Upcoming turns encoded in every observation.
pub const LOOKAHEAD_SLOTS: usize = 2;
/// Length of the observation vector.
pub const OBS_SIZE: usize = 6 + LOOKAHEAD_SLOTS * FEATURES_PER_TURN;
/// Throttle, brake, steering.
pub const ACTION_SIZE: usize = 3;

/// Independently weighted reward terms.
///
/// Progress always pays for forward distance gained; the lateral term is a
/// separate pressure to stay on the line. Both are tuning parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Per meter of progress along the line.
    pub progress: f32,
    /// Per m/s of speed.
    pub speed: f32,
    /// Times the squared offset in half widths.
    pub lateral: f32,
    /// Times the input change from the previous step.
    pub smoothness: f32,
    /// Charged on every step the friction circle clamps the steering.
    pub clamp: f32,
    pub off_track: f32,
    pub completion: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            progress: 1.0,
            speed: 0.001,
            lateral: 0.05,
            smoothness: 0.05,
            clamp: 0.02,
            off_track: 10.0,
            completion: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Seconds per step.
    pub dt: f32,
    /// Meters along the line where [`RacingEnv::reset`] places the car.
    pub start_distance: f32,
    /// Rolling start speed; a standing start is avoided.
    pub start_speed_kmh: f32,
    pub compound: TireCompound,
    pub weather: Weather,
    pub max_steps: u32,
    pub stuck_speed_kmh: f32,
    /// Consecutive slow steps tolerated before the episode ends as stuck.
    pub stuck_steps: u32,
    /// Meters of lookahead for the turn features.
    pub horizon: f32,
    /// Distance past the track extent beyond which a state is invalid.
    pub bounds_margin: f32,
    pub record_episode: bool,
    pub rewards: RewardWeights,
    pub car: CarParams,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            start_distance: 0.0,
            start_speed_kmh: 30.0,
            compound: TireCompound::Soft,
            weather: Weather::Dry,
            max_steps: 10_000,
            stuck_speed_kmh: 5.0,
            stuck_steps: 500,
            horizon: DEFAULT_HORIZON,
            bounds_margin: 100.0,
            record_episode: false,
            rewards: RewardWeights::default(),
            car: CarParams::default(),
        }
    }
}

impl EnvConfig {
    /// # Errors
    ///
    /// [`TrainError::Config`] for a non-positive timestep or step budget, or
    /// a negative or non-finite start speed.
    pub fn validate(&self) -> Result<(), TrainError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(TrainError::Config(format!("env timestep {} must be positive", self.dt)));
        }
        if self.max_steps == 0 {
            return Err(TrainError::Config("env step budget must allow at least one step".into()));
        }
        if !(self.start_speed_kmh.is_finite() && self.start_speed_kmh >= 0.0) {
            return Err(TrainError::Config(format!("start speed {} km/h is invalid", self.start_speed_kmh)));
        }
        Ok(())
    }
}

/// One recorded step: the state the action was taken in, the action and
/// its consequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: CarState,
    pub action: Action,
    pub reward: f32,
    pub done: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub transitions: Vec<Transition>,
    pub outcome: Option<Outcome>,
}

impl Episode {
    #[must_use]
    pub fn total_reward(&self) -> f32 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Running,
    Terminated(Outcome),
}

/// A car on a track, stepped one physics tick per action.
///
/// Each instance owns its [`CarState`]; the track is shared read-only.
pub struct RacingEnv {
    track: Arc<TrackGeometry>,
    dynamics: CarDynamics,
    config: EnvConfig,
    state: CarState,
    projection: Projection,
    phase: Phase,
    start_distance: f32,
    progress: f32,
    steps: u32,
    slow_steps: u32,
    last_action: Action,
    last_obs: Vec<f32>,
    total_reward: f32,
    episode: Option<Episode>,
}

impl RacingEnv {
    /// Build the environment and place the car at the configured start.
    #[must_use]
    pub fn new(track: Arc<TrackGeometry>, config: EnvConfig) -> Self {
        let dynamics = CarDynamics::new(config.car.clone(), config.weather);
        let state = CarState::new(Vec2::ZERO, 0.0, 0.0, config.compound);
        let projection = track.project(state.position);
        let mut env = Self {
            track,
            dynamics,
            config,
            state,
            projection,
            phase: Phase::Running,
            start_distance: 0.0,
            progress: 0.0,
            steps: 0,
            slow_steps: 0,
            last_action: Action::COAST,
            last_obs: Vec::new(),
            total_reward: 0.0,
            episode: None,
        };
        env.reset();
        env
    }

    /// Start an episode from an arbitrary state.
    pub fn reset_to(&mut self, state: CarState) -> Vec<f32> {
        self.state = state;
        self.projection = self.track.project(state.position);
        self.start_distance = self.projection.distance;
        self.phase = Phase::Running;
        self.progress = 0.0;
        self.steps = 0;
        self.slow_steps = 0;
        self.last_action = Action::COAST;
        self.total_reward = 0.0;
        self.episode = self.config.record_episode.then(Episode::default);
        self.last_obs = self.observe();
        self.last_obs.clone()
    }

    /// The state [`reset`](Env::reset) starts from.
    #[must_use]
    pub fn start_state(&self) -> CarState {
        let start = self.track.point_at(self.config.start_distance);
        CarState::new(start.position, start.heading, self.config.start_speed_kmh / 3.6, self.config.compound)
    }

    /// Advance one tick under a physical action.
    pub fn step_action(&mut self, action: Action) -> Step {
        if let Phase::Terminated(outcome) = self.phase {
            return Step { obs: self.last_obs.clone(), reward: 0.0, done: true, outcome: Some(outcome) };
        }
        let action = action.clamped();
        let before = self.state;

        let report = match self.dynamics.step(&self.state, &action, self.config.dt) {
            Ok(report) => report,
            Err(err) => {
                debug!(step = self.steps, %err, "physics step failed");
                return self.terminate(before, action, Outcome::Diverged);
            }
        };
        let next = report.state;
        if !self.is_valid(&next) {
            debug!(step = self.steps, x = next.position.x, y = next.position.y, "car left the valid state space");
            return self.terminate(before, action, Outcome::Diverged);
        }

        let projection = self.track.project(next.position);
        let delta = self.progress_delta(projection.distance);
        self.state = next;
        self.projection = projection;
        self.progress += delta;
        self.steps += 1;

        let w = &self.config.rewards;
        let half = self.track.boundary_half_width(projection.distance, projection.lateral_offset).max(0.1);
        let lateral = (projection.lateral_offset / half).powi(2);
        let mut reward = w.progress * delta + w.speed * next.speed
            - w.lateral * lateral
            - w.smoothness * action.change_from(&self.last_action);
        if report.steering_clamped {
            reward -= w.clamp;
        }
        self.last_action = action;

        if next.speed * 3.6 < self.config.stuck_speed_kmh {
            self.slow_steps += 1;
        } else {
            self.slow_steps = 0;
        }

        let outcome = if self.track.is_off_track(&projection) {
            reward -= w.off_track;
            Some(Outcome::OffTrack)
        } else if self.slow_steps > self.config.stuck_steps {
            Some(Outcome::Stuck)
        } else if self.progress + 0.5 >= self.lap_target() {
            reward += w.completion;
            Some(Outcome::LapComplete)
        } else if self.steps >= self.config.max_steps {
            Some(Outcome::MaxSteps)
        } else {
            None
        };

        self.last_obs = self.observe();
        self.finish_step(before, action, reward, outcome)
    }

    fn terminate(&mut self, before: CarState, action: Action, outcome: Outcome) -> Step {
        self.steps += 1;
        self.finish_step(before, action, 0.0, Some(outcome))
    }

    fn finish_step(&mut self, before: CarState, action: Action, reward: f32, outcome: Option<Outcome>) -> Step {
        self.total_reward += reward;
        let done = outcome.is_some();
        if let Some(episode) = &mut self.episode {
            episode.transitions.push(Transition { state: before, action, reward, done });
            episode.outcome = outcome;
        }
        if let Some(outcome) = outcome {
            self.phase = Phase::Terminated(outcome);
            debug!(
                %outcome,
                steps = self.steps,
                progress = self.progress,
                reward = self.total_reward,
                "episode finished"
            );
        }
        Step { obs: self.last_obs.clone(), reward, done, outcome }
    }

    fn is_valid(&self, state: &CarState) -> bool {
        state.speed >= 0.0
            && state.tire_wear.iter().all(|w| (0.0..=1.0).contains(w))
            && self.track.within_bounds(state.position, self.config.bounds_margin)
    }

    /// Signed distance gained since the last projection, unwrapped across the
    /// start line of a closed track.
    fn progress_delta(&self, distance: f32) -> f32 {
        let mut delta = distance - self.projection.distance;
        if self.track.is_closed() {
            let length = self.track.length();
            if delta > 0.5 * length {
                delta -= length;
            } else if delta < -0.5 * length {
                delta += length;
            }
        }
        delta
    }

    /// Progress that completes the episode: a full lap on a closed track,
    /// the rest of the line on an open one.
    #[must_use]
    pub fn lap_target(&self) -> f32 {
        if self.track.is_closed() {
            self.track.length()
        } else {
            self.track.length() - self.start_distance
        }
    }

    /// Observation for the current state.
    ///
    /// Six car features followed by [`LOOKAHEAD_SLOTS`] turn slots: lateral
    /// offset in half widths, heading error over π, speed over 100 m/s, mean
    /// tire wear, mean tire temperature around 100 °C, local curvature.
    #[must_use]
    pub fn observe(&self) -> Vec<f32> {
        let s = &self.state;
        let p = &self.projection;
        let half = self.track.boundary_half_width(p.distance, p.lateral_offset).max(0.1);
        let mean_temp = s.tire_temp.iter().sum::<f32>() / CORNERS as f32;

        let mut obs = Vec::with_capacity(OBS_SIZE);
        obs.extend([
            (p.lateral_offset / half).clamp(-2.0, 2.0),
            wrap_angle(s.heading - p.heading) / PI,
            s.speed / 100.0,
            s.mean_wear(),
            ((mean_temp - 100.0) / 50.0).clamp(-2.0, 2.0),
            (p.curvature * 20.0).clamp(-1.0, 1.0),
        ]);
        obs.extend(self.track.lookahead_features(p.distance, self.config.horizon, LOOKAHEAD_SLOTS));
        obs
    }

    #[must_use]
    pub fn track(&self) -> &Arc<TrackGeometry> {
        &self.track
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &CarState {
        &self.state
    }

    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Meters gained along the line this episode.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Simulated seconds this episode.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.steps as f32 * self.config.dt
    }

    #[must_use]
    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }

    #[must_use]
    pub fn start_distance(&self) -> f32 {
        self.start_distance
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Running => None,
            Phase::Terminated(outcome) => Some(outcome),
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outcome().is_some()
    }

    /// The recorded episode, when recording is enabled.
    #[must_use]
    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    pub fn take_episode(&mut self) -> Option<Episode> {
        self.episode.take()
    }
}

impl Env for RacingEnv {
    /// `action` is `[throttle, brake, steering]` in `[-1, 1]`.
    fn step(&mut self, action: &[f32]) -> Step {
        let mut v = [0.0; ACTION_SIZE];
        for (dst, src) in v.iter_mut().zip(action) {
            *dst = *src;
        }
        self.step_action(Action::from_normalized(v))
    }

    fn reset(&mut self) -> Vec<f32> {
        let start = self.start_state();
        self.reset_to(start)
    }

    fn obs_size(&self) -> usize {
        OBS_SIZE
    }

    fn action_size(&self) -> usize {
        ACTION_SIZE
    }
}
