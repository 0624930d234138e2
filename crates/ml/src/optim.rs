use crate::network::PolicyParameters;
use serde::{Deserialize, Serialize};

/// Adam hyperparameters. The moment estimates live in [`AdamState`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adam {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
}

impl Default for Adam {
    fn default() -> Self {
        Self { lr: 3e-4, beta1: 0.9, beta2: 0.999, eps: 1e-8 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub t: u64,
    pub m: Vec<f32>,
    pub v: Vec<f32>,
}

impl AdamState {
    pub fn new(params: &PolicyParameters) -> Self {
        let n = params.param_count();
        Self { t: 0, m: vec![0.0; n], v: vec![0.0; n] }
    }
}

impl Adam {
    pub fn with_lr(lr: f32) -> Self {
        Self { lr, ..Self::default() }
    }

    /// Apply one bias-corrected Adam update and bump `params.version`.
    pub fn step(&self, state: &mut AdamState, params: &mut PolicyParameters, grads: &PolicyParameters) {
        let n = params.param_count();
        if state.m.len() != n || state.v.len() != n {
            *state = AdamState::new(params);
        }
        state.t += 1;
        let t = i32::try_from(state.t).unwrap_or(i32::MAX);
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        let mut k = 0;
        for (p, g) in params.slices_mut().into_iter().zip(grads.slices()) {
            for (pv, &gv) in p.iter_mut().zip(g) {
                state.m[k] = self.beta1 * state.m[k] + (1.0 - self.beta1) * gv;
                state.v[k] = self.beta2 * state.v[k] + (1.0 - self.beta2) * gv * gv;
                let m_hat = state.m[k] / bias1;
                let v_hat = state.v[k] / bias2;
                *pv -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
                k += 1;
            }
        }
        params.version += 1;
    }
}

/// Rescale `grads` so their global L2 norm is at most `max_norm`.
/// Returns the norm before clipping.
pub fn clip_grad_norm(grads: &mut PolicyParameters, max_norm: f32) -> f32 {
    let norm = grads.global_norm();
    if norm > max_norm && norm > 0.0 {
        grads.scale(max_norm / norm);
    }
    norm
}
