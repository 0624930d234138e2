//! Vehicle and tire constants.
//!
//! Defaults describe a 2024-regulation car: 798 kg minimum mass, a 710 kW
//! hybrid power unit and carbon brakes. They are calibrated so that a launch
//! from rest reaches 100 km/h in roughly 2.6 s.

use crate::types::TireCompound;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarParams {
    /// Dry mass in kg, driver included, fuel excluded.
    pub mass: f32,
    pub gravity: f32,
    pub air_density: f32,
    pub drag_coefficient: f32,
    pub downforce_coefficient: f32,
    /// m²
    pub frontal_area: f32,
    /// W
    pub max_power: f32,
    pub idle_rpm: f32,
    pub max_rpm: f32,
    pub power_peak_rpm: f32,
    pub gear_ratios: Vec<f32>,
    pub final_drive: f32,
    /// m
    pub wheel_radius: f32,
    /// N at full pedal.
    pub max_brake_force: f32,
    /// m
    pub wheelbase: f32,
    /// m
    pub track_width: f32,
    /// m
    pub cg_height: f32,
    /// Fraction of static load on the front axle.
    pub static_front_share: f32,
    /// Radians at full lock.
    pub max_steer_angle: f32,
    pub rolling_resistance: f32,
    /// Below this speed drive force is traction-limited by launch grip.
    pub traction_limited_below_kmh: f32,
    pub launch_grip: f32,
    /// N of drive force at full throttle from a standstill.
    pub launch_force: f32,
    /// kg per meter driven.
    pub fuel_per_meter: f32,
    pub tires: TireParams,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            mass: 798.0,
            gravity: 9.81,
            air_density: 1.2,
            drag_coefficient: 0.9,
            downforce_coefficient: 3.0,
            frontal_area: 1.5,
            max_power: 710_000.0,
            idle_rpm: 5000.0,
            max_rpm: 15_000.0,
            power_peak_rpm: 11_000.0,
            gear_ratios: vec![3.5, 2.8, 2.2, 1.8, 1.5, 1.3, 1.15, 1.0],
            final_drive: 3.5,
            wheel_radius: 0.33,
            max_brake_force: 18_000.0,
            wheelbase: 3.6,
            track_width: 1.6,
            cg_height: 0.3,
            static_front_share: 0.45,
            max_steer_angle: 30.0_f32.to_radians(),
            rolling_resistance: 0.015,
            traction_limited_below_kmh: 100.0,
            launch_grip: 0.85,
            launch_force: 10_000.0,
            fuel_per_meter: 0.000_6,
            tires: TireParams::default(),
        }
    }
}

impl CarParams {
    /// Engine power in watts for an rpm and a throttle percentage.
    ///
    /// The power curve is a Gaussian around `power_peak_rpm`.
    #[must_use]
    pub fn engine_power(&self, rpm: f32, throttle: f32) -> f32 {
        let rpm = rpm.clamp(self.idle_rpm, self.max_rpm);
        let ratio = rpm / self.power_peak_rpm;
        let factor = (-0.5 * (ratio - 1.0).powi(2) / 0.3).exp();
        self.max_power * factor * (throttle.clamp(0.0, 100.0) / 100.0)
    }

    #[must_use]
    pub fn gear_count(&self) -> u8 {
        u8::try_from(self.gear_ratios.len()).unwrap_or(u8::MAX)
    }
}

/// Grip, wear and operating window of one compound.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompoundSpec {
    pub base_grip: f32,
    /// Wear per meter at nominal load.
    pub wear_rate: f32,
    /// °C
    pub window_low: f32,
    /// °C
    pub window_high: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireParams {
    pub soft: CompoundSpec,
    pub medium: CompoundSpec,
    pub hard: CompoundSpec,
    /// Fraction of grip lost at full wear.
    pub wear_grip_loss: f32,
    /// Grip lost per °C outside the operating window.
    pub temp_falloff: f32,
    pub min_temp_factor: f32,
    /// Seconds.
    pub temp_time_constant: f32,
    /// °C per m/s of rolling speed.
    pub temp_speed_gain: f32,
    /// °C at full friction utilisation.
    pub temp_load_gain: f32,
}

impl Default for TireParams {
    fn default() -> Self {
        Self {
            soft: CompoundSpec { base_grip: 1.55, wear_rate: 4.0e-5, window_low: 85.0, window_high: 105.0 },
            medium: CompoundSpec { base_grip: 1.45, wear_rate: 2.6e-5, window_low: 90.0, window_high: 110.0 },
            hard: CompoundSpec { base_grip: 1.35, wear_rate: 1.6e-5, window_low: 95.0, window_high: 115.0 },
            wear_grip_loss: 0.35,
            temp_falloff: 0.004,
            min_temp_factor: 0.75,
            temp_time_constant: 8.0,
            temp_speed_gain: 0.45,
            temp_load_gain: 75.0,
        }
    }
}

impl TireParams {
    #[must_use]
    pub fn spec(&self, compound: TireCompound) -> &CompoundSpec {
        match compound {
            TireCompound::Soft => &self.soft,
            TireCompound::Medium => &self.medium,
            TireCompound::Hard => &self.hard,
        }
    }
}
