//! # Tire Model
//!
//! Grip as a function of compound, wear and temperature, plus the wear and
//! temperature update rules applied once per step for each corner.

use crate::params::{CompoundSpec, TireParams};

/// Friction coefficient of one tire.
///
/// Grip is highest inside `[window_low, window_high]` and falls off linearly
/// outside it down to `min_temp_factor` of the peak. Wear removes up to
/// `wear_grip_loss` of the base grip.
#[must_use]
pub fn grip_coefficient(spec: &CompoundSpec, params: &TireParams, wear: f32, temp: f32) -> f32 {
    let wear_factor = 1.0 - params.wear_grip_loss * wear.clamp(0.0, 1.0);
    let outside = if temp < spec.window_low {
        spec.window_low - temp
    } else if temp > spec.window_high {
        temp - spec.window_high
    } else {
        0.0
    };
    let temp_factor = (1.0 - params.temp_falloff * outside).max(params.min_temp_factor);
    spec.base_grip * wear_factor * temp_factor
}

/// Wear added over `ds` meters. Never negative.
///
/// `load_share` is the corner's fraction of the vertical load (0.25 when the
/// car is balanced) and `utilisation` the fraction of the friction circle in use.
#[must_use]
pub fn wear_increment(spec: &CompoundSpec, load_share: f32, utilisation: f32, ds: f32) -> f32 {
    let load = (load_share * 4.0).max(0.0);
    (spec.wear_rate * ds.max(0.0) * load * (0.25 + utilisation.clamp(0.0, 1.0))).max(0.0)
}

/// Temperature the tire settles at for a steady load.
#[must_use]
pub fn equilibrium_temperature(
    params: &TireParams,
    ambient: f32,
    speed: f32,
    load_share: f32,
    utilisation: f32,
) -> f32 {
    ambient
        + params.temp_speed_gain * speed.max(0.0)
        + params.temp_load_gain * utilisation.clamp(0.0, 1.0) * (load_share * 4.0)
}

/// First-order lag towards `target`.
#[must_use]
pub fn relax_temperature(current: f32, target: f32, dt: f32, time_constant: f32) -> f32 {
    let alpha = (dt / time_constant.max(dt)).clamp(0.0, 1.0);
    current + (target - current) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grip_peaks_inside_operating_window() {
        let params = TireParams::default();
        let spec = params.soft;
        let cold = grip_coefficient(&spec, &params, 0.0, 60.0);
        let warm = grip_coefficient(&spec, &params, 0.0, 95.0);
        let hot = grip_coefficient(&spec, &params, 0.0, 130.0);
        assert!(warm > cold);
        assert!(warm > hot);
        assert!((warm - spec.base_grip).abs() < 1e-6);
    }

    #[test]
    fn worn_tires_grip_less() {
        let params = TireParams::default();
        let fresh = grip_coefficient(&params.medium, &params, 0.0, 100.0);
        let worn = grip_coefficient(&params.medium, &params, 0.8, 100.0);
        assert!(worn < fresh);
    }

    #[test]
    fn temperature_approaches_target_without_overshoot() {
        let mut t = 80.0;
        for _ in 0..10_000 {
            t = relax_temperature(t, 100.0, 0.01, 8.0);
            assert!(t <= 100.0);
        }
        assert!((t - 100.0).abs() < 0.1);
    }
}
