//! Deterministic drivers over the racing observation.

use crate::checkpoint::Checkpoint;
use crate::error::TrainError;
use crate::racing::{ACTION_SIZE, OBS_SIZE};
use ml::PolicyParameters;
use physics::Action;
use std::f32::consts::PI;
use track::DEFAULT_HORIZON;

pub trait Policy: Send + Sync {
    /// Action for an observation laid out as [`RacingEnv::observe`](crate::RacingEnv::observe) produces it.
    fn act(&self, obs: &[f32]) -> Action;
}

/// The trained network's mean action.
#[derive(Clone, Debug)]
pub struct GreedyPolicy {
    params: PolicyParameters,
}

impl GreedyPolicy {
    #[must_use]
    pub fn new(params: PolicyParameters) -> Self {
        Self { params }
    }

    /// The checkpointed network, once verified and checked against the
    /// racing observation and action sizes.
    ///
    /// # Errors
    ///
    /// A fingerprint mismatch, or [`TrainError::Config`] for a network of
    /// the wrong shape.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Result<Self, TrainError> {
        checkpoint.verify()?;
        check_racing_network(&checkpoint.params)?;
        Ok(Self::new(checkpoint.params.clone()))
    }

    #[must_use]
    pub fn params(&self) -> &PolicyParameters {
        &self.params
    }
}

/// # Errors
///
/// [`TrainError::Config`] unless `params` maps [`OBS_SIZE`] inputs to
/// [`ACTION_SIZE`] outputs.
pub fn check_racing_network(params: &PolicyParameters) -> Result<(), TrainError> {
    if params.obs_dim() == OBS_SIZE && params.act_dim() == ACTION_SIZE {
        Ok(())
    } else {
        Err(TrainError::Config(format!(
            "network maps {} -> {}, the racing environment needs {OBS_SIZE} -> {ACTION_SIZE}",
            params.obs_dim(),
            params.act_dim()
        )))
    }
}

impl Policy for GreedyPolicy {
    fn act(&self, obs: &[f32]) -> Action {
        let mean = self.params.forward(obs).mean;
        let mut v = [0.0; ACTION_SIZE];
        for (dst, src) in v.iter_mut().zip(&mean) {
            *dst = *src;
        }
        Action::from_normalized(v)
    }
}

/// Rule-based driver: steers back onto the line and brakes for the next
/// turn's target speed.
#[derive(Clone, Debug, PartialEq)]
pub struct LineFollower {
    /// Steering per half width of lateral offset.
    pub lateral_gain: f32,
    /// Steering per radian of heading error.
    pub heading_gain: f32,
    /// Deceleration assumed when planning the braking point, m/s².
    pub braking: f32,
    /// Lateral acceleration held through a corner, m/s².
    pub cornering: f32,
    pub wheelbase: f32,
    /// Radians at full steering lock.
    pub max_steer_angle: f32,
    /// Must match the environment's lookahead horizon.
    pub horizon: f32,
}

impl Default for LineFollower {
    fn default() -> Self {
        Self {
            lateral_gain: 0.5,
            heading_gain: 1.5,
            braking: 20.0,
            cornering: 22.0,
            wheelbase: 3.6,
            max_steer_angle: 30.0_f32.to_radians(),
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl Policy for LineFollower {
    fn act(&self, obs: &[f32]) -> Action {
        if obs.len() < OBS_SIZE {
            return Action::COAST;
        }
        let offset = obs[0];
        let heading_error = obs[1] * PI;
        let speed = obs[2] * 100.0;
        let curvature = obs[5] / 20.0;

        let feedforward = (curvature * self.wheelbase).atan() / self.max_steer_angle;
        let steering = feedforward - self.lateral_gain * offset - self.heading_gain * heading_error;

        // the feature padding `[1, 1, ..]` means no turn within the horizon
        let turn_ahead = obs[6] < 1.0 || obs[7] < 1.0;
        let mut target = f32::INFINITY;
        if turn_ahead {
            let to_apex = (obs[6] * self.horizon).max(1.0);
            let apex_speed = obs[7] * 360.0 / 3.6;
            let reachable = (apex_speed * apex_speed + 2.0 * self.braking * to_apex).sqrt();
            target = target.min(reachable);
        }
        if curvature.abs() > 1e-4 {
            target = target.min((self.cornering / curvature.abs()).sqrt());
        }

        let (throttle, brake) = if speed > target * 1.02 {
            (0.0, 100.0)
        } else if speed > target * 0.97 {
            (0.0, 0.0)
        } else {
            (100.0, 0.0)
        };
        Action::new(throttle, brake, steering).clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(offset: f32, heading: f32, speed: f32, apex: Option<(f32, f32)>) -> Vec<f32> {
        let mut o = vec![offset, heading / PI, speed / 100.0, 0.0, 0.0, 0.0];
        match apex {
            Some((distance, kmh)) => o.extend([distance / DEFAULT_HORIZON, kmh / 360.0, 0.5]),
            None => o.extend([1.0, 1.0, 0.0]),
        }
        o.extend([1.0, 1.0, 0.0]);
        o
    }

    #[test]
    fn networks_of_the_wrong_shape_are_rejected() {
        let fits = PolicyParameters::new(OBS_SIZE, &[8], ACTION_SIZE, -0.5, 1);
        assert!(check_racing_network(&fits).is_ok());
        let narrow = PolicyParameters::new(OBS_SIZE - 2, &[8], ACTION_SIZE, -0.5, 1);
        assert!(matches!(check_racing_network(&narrow), Err(TrainError::Config(_))));
        let wide = PolicyParameters::new(OBS_SIZE, &[8], ACTION_SIZE + 1, -0.5, 1);
        assert!(matches!(check_racing_network(&wide), Err(TrainError::Config(_))));
    }

    #[test]
    fn steers_back_towards_the_line() {
        let driver = LineFollower::default();
        assert!(driver.act(&obs(0.5, 0.0, 30.0, None)).steering < 0.0);
        assert!(driver.act(&obs(-0.5, 0.0, 30.0, None)).steering > 0.0);
        assert!(driver.act(&obs(0.0, 0.2, 30.0, None)).steering < 0.0);
    }

    #[test]
    fn full_throttle_on_an_empty_straight() {
        let a = LineFollower::default().act(&obs(0.0, 0.0, 50.0, None));
        assert_eq!(a, Action::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn brakes_for_a_slow_turn() {
        let a = LineFollower::default().act(&obs(0.0, 0.0, 80.0, Some((50.0, 80.0))));
        assert_eq!(a.throttle, 0.0);
        assert_eq!(a.brake, 100.0);
    }

    #[test]
    fn short_observation_coasts() {
        assert_eq!(LineFollower::default().act(&[0.0; 3]), Action::COAST);
    }

    #[test]
    fn greedy_policy_actions_are_in_range() {
        let params = PolicyParameters::new(OBS_SIZE, &[16], ACTION_SIZE, -0.5, 3);
        let a = GreedyPolicy::new(params).act(&obs(0.3, 0.1, 40.0, Some((120.0, 90.0))));
        assert_eq!(a, a.clamped());
    }
}
