//! # Physics Integration
//!
//! Force computation and the fixed-step semi-implicit Euler update of a
//! [`CarState`]. Speed is integrated first and the new speed drives the
//! position and heading update.

use crate::error::PhysicsError;
use crate::params::CarParams;
use crate::tire;
use crate::types::{Action, CarState, Vec2, Weather, CORNERS, FL, FR, RL, RR};
use serde::{Deserialize, Serialize};

/// Longitudinal and lateral tire force after the friction-circle clamp.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceSplit {
    pub longitudinal: f32,
    pub lateral: f32,
    pub longitudinal_clamped: bool,
    pub lateral_clamped: bool,
}

/// Clamp a force demand into the friction circle of radius `limit`.
///
/// Longitudinal demand has priority: it is clamped to the limit first and the
/// lateral demand gets whatever budget remains.
#[must_use]
pub fn friction_circle(longitudinal: f32, lateral: f32, limit: f32) -> ForceSplit {
    let limit = if limit.is_finite() { limit.max(0.0) } else { 0.0 };
    let mut long = longitudinal.clamp(-limit, limit);
    let budget = (limit * limit - long * long).max(0.0).sqrt();
    let mut lat = lateral.clamp(-budget, budget);

    // rounding in the sqrt can leave the pair a hair outside the circle
    let combined = long.hypot(lat);
    if combined > limit && combined > 0.0 {
        let scale = limit / combined;
        long *= scale;
        lat *= scale;
    }

    ForceSplit {
        longitudinal: long,
        lateral: lat,
        longitudinal_clamped: long != longitudinal,
        lateral_clamped: lat != lateral,
    }
}

/// Forces acting on the car during one step, in newtons.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceReport {
    pub drive: f32,
    pub brake: f32,
    pub drag: f32,
    pub downforce: f32,
    pub rolling: f32,
    /// Tire force along the heading after the clamp.
    pub longitudinal: f32,
    /// Tire force across the heading after the clamp.
    pub lateral: f32,
    pub requested_lateral: f32,
    /// Radius of the friction circle.
    pub friction_limit: f32,
    /// Effective friction coefficient for this step.
    pub grip: f32,
}

impl ForceReport {
    #[must_use]
    pub fn combined(&self) -> f32 {
        self.longitudinal.hypot(self.lateral)
    }

    #[must_use]
    pub fn utilisation(&self) -> f32 {
        if self.friction_limit > 0.0 {
            (self.combined() / self.friction_limit).min(1.0)
        } else {
            1.0
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    pub state: CarState,
    pub forces: ForceReport,
    /// The steering request exceeded the lateral grip budget.
    pub steering_clamped: bool,
    /// The drive or brake request exceeded the friction limit.
    pub longitudinal_clamped: bool,
}

/// The car model: vehicle constants plus the surface it drives on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarDynamics {
    pub params: CarParams,
    pub weather: Weather,
}

impl Default for CarDynamics {
    fn default() -> Self {
        Self::new(CarParams::default(), Weather::Dry)
    }
}

impl CarDynamics {
    #[must_use]
    pub fn new(params: CarParams, weather: Weather) -> Self {
        Self { params, weather }
    }

    /// Advance `state` by `dt` seconds under `action`.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidTimestep`] for a non-positive or
    /// non-finite `dt`, and [`PhysicsError::SimulationDivergence`] if any
    /// quantity of the resulting state is not finite.
    pub fn step(&self, state: &CarState, action: &Action, dt: f32) -> Result<StepReport, PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        if let Some(quantity) = state.first_non_finite() {
            return Err(PhysicsError::SimulationDivergence { quantity });
        }

        let p = &self.params;
        let input = action.clamped();
        let speed = state.speed.max(0.0);
        let mass = p.mass + state.fuel_kg.max(0.0);
        let weight = mass * p.gravity;

        let q = 0.5 * p.air_density * speed * speed * p.frontal_area;
        let drag = q * p.drag_coefficient;
        let downforce = q * p.downforce_coefficient;
        let vertical_load = weight + downforce;

        // load moves rearwards under acceleration, forwards under braking
        let transfer = mass * state.long_accel * p.cg_height / (p.wheelbase * vertical_load);
        let front_share = (p.static_front_share - transfer).clamp(0.2, 0.8);
        let rear_share = 1.0 - front_share;

        let spec = p.tires.spec(state.compound);
        let corner_grip: [f32; CORNERS] = std::array::from_fn(|i| {
            tire::grip_coefficient(spec, &p.tires, state.tire_wear[i], state.tire_temp[i])
        });
        let front_grip = 0.5 * (corner_grip[FL] + corner_grip[FR]);
        let rear_grip = 0.5 * (corner_grip[RL] + corner_grip[RR]);
        let grip = (front_share * front_grip + rear_share * rear_grip) * self.weather.grip_factor();
        let friction_limit = grip * vertical_load;

        let (rpm, drive) = self.drive_force(state, speed, input.throttle, vertical_load, grip);
        let brake = p.max_brake_force * input.brake / 100.0;

        let requested_curvature = (input.steering * p.max_steer_angle).tan() / p.wheelbase;
        let requested_lateral = mass * speed * speed * requested_curvature;
        let split = friction_circle(drive - brake, requested_lateral, friction_limit);

        let curvature = if requested_lateral != 0.0 {
            requested_curvature * (split.lateral / requested_lateral)
        } else if speed == 0.0 {
            requested_curvature
        } else {
            0.0
        };

        let rolling = if speed > 0.0 { p.rolling_resistance * vertical_load } else { 0.0 };
        let net = split.longitudinal - drag - rolling;
        let new_speed = (speed + net / mass * dt).max(0.0);

        let mut next = *state;
        next.speed = new_speed;
        next.long_accel = (new_speed - speed) / dt;
        next.lat_accel = new_speed * new_speed * curvature;
        next.heading = wrap_angle(state.heading + new_speed * curvature * dt);
        next.position = state.position + Vec2::from_angle(next.heading) * (new_speed * dt);
        next.rpm = rpm;

        let ds = new_speed * dt;
        next.odometer += ds;
        next.elapsed += dt;
        next.fuel_kg = (state.fuel_kg - p.fuel_per_meter * ds).max(0.0);

        let forces = ForceReport {
            drive,
            brake,
            drag,
            downforce,
            rolling,
            longitudinal: split.longitudinal,
            lateral: split.lateral,
            requested_lateral,
            friction_limit,
            grip,
        };
        self.update_tires(&mut next, &forces, front_share, new_speed, ds, dt);
        next.gear = self.shift(state.gear, rpm);

        if let Some(quantity) = next.first_non_finite() {
            return Err(PhysicsError::SimulationDivergence { quantity });
        }

        Ok(StepReport {
            state: next,
            forces,
            steering_clamped: split.lateral_clamped,
            longitudinal_clamped: split.longitudinal_clamped,
        })
    }

    /// Engine rpm and the drive force the tires can transmit.
    fn drive_force(&self, state: &CarState, speed: f32, throttle: f32, vertical_load: f32, grip: f32) -> (f32, f32) {
        let p = &self.params;
        if p.gear_ratios.is_empty() {
            return (p.idle_rpm, 0.0);
        }
        let gear = usize::from(state.gear.clamp(1, p.gear_count())) - 1;
        let ratio = p.gear_ratios[gear];

        let rpm = if speed > 0.1 {
            let wheel_rpm = speed * 60.0 / (2.0 * std::f32::consts::PI * p.wheel_radius);
            (wheel_rpm * ratio * p.final_drive).clamp(p.idle_rpm, p.max_rpm)
        } else {
            p.idle_rpm
        };
        let power = p.engine_power(rpm, throttle);

        let speed_kmh = speed * 3.6;
        let (desired, traction) = if speed_kmh < p.traction_limited_below_kmh {
            let desired = if speed > 0.5 { power / speed } else { p.launch_force * throttle / 100.0 };
            let blend = speed_kmh / p.traction_limited_below_kmh;
            let traction = (p.launch_grip + (grip - p.launch_grip) * blend).min(grip);
            (desired, traction)
        } else {
            (power / speed, grip)
        };
        (rpm, desired.min(vertical_load * traction).max(0.0))
    }

    fn update_tires(&self, next: &mut CarState, forces: &ForceReport, front_share: f32, speed: f32, ds: f32, dt: f32) {
        let p = &self.params;
        let spec = p.tires.spec(next.compound);
        let utilisation = forces.utilisation();

        // a left turn loads the right-hand tires
        let lateral_shift =
            (next.lat_accel * p.cg_height / (p.track_width * p.gravity)).clamp(-0.4, 0.4);
        let axle = [front_share, front_share, 1.0 - front_share, 1.0 - front_share];
        let side = [-1.0, 1.0, -1.0, 1.0];
        let ambient = self.weather.ambient_temp();

        for i in 0..CORNERS {
            let share = axle[i] * (0.5 + 0.5 * side[i] * lateral_shift);
            let wear = next.tire_wear[i] + tire::wear_increment(spec, share, utilisation, ds);
            next.tire_wear[i] = wear.min(1.0).max(next.tire_wear[i].min(1.0));

            let target = tire::equilibrium_temperature(&p.tires, ambient, speed, share, utilisation);
            next.tire_temp[i] =
                tire::relax_temperature(next.tire_temp[i], target, dt, p.tires.temp_time_constant);
        }
    }

    fn shift(&self, gear: u8, rpm: f32) -> u8 {
        let p = &self.params;
        let top = p.gear_count().max(1);
        let gear = gear.clamp(1, top);
        if rpm > p.max_rpm * 0.95 && gear < top {
            gear + 1
        } else if rpm < p.max_rpm * 0.5 && gear > 1 {
            gear - 1
        } else {
            gear
        }
    }
}

/// Wrap an angle into `[-π, π)`.
#[must_use]
pub fn wrap_angle(theta: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (theta + PI).rem_euclid(TAU) - PI
}
