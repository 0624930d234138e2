//! Diagonal Gaussian over continuous actions.

use std::f32::consts::PI;

/// Bounds on the learned log standard deviation.
pub const LOG_STD_MIN: f32 = -5.0;
pub const LOG_STD_MAX: f32 = 1.0;

/// Log density of `action` under `N(mean, exp(log_std)^2)`.
pub fn log_prob(action: &[f32], mean: &[f32], log_std: &[f32]) -> f32 {
    action
        .iter()
        .zip(mean)
        .zip(log_std)
        .map(|((&a, &m), &ls)| {
            let z = (a - m) / ls.exp();
            -0.5 * z * z - ls - 0.5 * (2.0 * PI).ln()
        })
        .sum()
}

pub fn entropy(log_std: &[f32]) -> f32 {
    log_std.iter().map(|ls| ls + 0.5 * (1.0 + (2.0 * PI).ln())).sum()
}

/// Standard normal draw via Box-Muller.
pub fn sample_normal(rng: &mut fastrand::Rng) -> f32 {
    let u1 = rng.f32().max(f32::MIN_POSITIVE);
    let u2 = rng.f32();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
