//! Actor-critic parameters and their forward and backward passes.

use crate::dense::{tanh_backward, tanh_forward, Dense};
use crate::gaussian::{LOG_STD_MAX, LOG_STD_MIN};
use serde::{Deserialize, Serialize};

/// Versioned parameter set of the actor-critic network.
///
/// The trunk is a stack of tanh layers. The actor head produces the action
/// mean squashed into `[-1, 1]`; `log_std` is a free parameter per action
/// dimension; the critic head produces a scalar state value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    /// Number of optimizer steps applied.
    pub version: u64,
    pub trunk: Vec<Dense>,
    pub actor: Dense,
    pub log_std: Vec<f32>,
    pub critic: Dense,
}

/// Activations kept from a forward pass for the backward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Forward {
    /// Input of every trunk layer followed by the trunk output.
    pub activations: Vec<Vec<f32>>,
    pub mean: Vec<f32>,
    pub value: f32,
}

impl PolicyParameters {
    pub fn new(obs_dim: usize, hidden: &[usize], act_dim: usize, initial_log_std: f32, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut trunk = Vec::with_capacity(hidden.len());
        let mut in_dim = obs_dim;
        for &width in hidden {
            trunk.push(Dense::xavier(in_dim, width, 1.0, &mut rng));
            in_dim = width;
        }
        // near-zero initial mean keeps early actions centred
        let actor = Dense::xavier(in_dim, act_dim, 0.01, &mut rng);
        let critic = Dense::xavier(in_dim, 1, 1.0, &mut rng);
        Self {
            version: 0,
            trunk,
            actor,
            log_std: vec![initial_log_std.clamp(LOG_STD_MIN, LOG_STD_MAX); act_dim],
            critic,
        }
    }

    /// Same shape, every value zero. Used as the gradient accumulator.
    pub fn zeros_like(&self) -> Self {
        let zero = |l: &Dense| Dense::zeros(l.in_dim, l.out_dim);
        Self {
            version: 0,
            trunk: self.trunk.iter().map(zero).collect(),
            actor: zero(&self.actor),
            log_std: vec![0.0; self.log_std.len()],
            critic: zero(&self.critic),
        }
    }

    pub fn obs_dim(&self) -> usize {
        self.trunk.first().map_or(self.actor.in_dim, |l| l.in_dim)
    }

    pub fn act_dim(&self) -> usize {
        self.actor.out_dim
    }

    pub fn forward(&self, obs: &[f32]) -> Forward {
        let mut activations = Vec::with_capacity(self.trunk.len() + 1);
        let mut h = obs.to_vec();
        for layer in &self.trunk {
            let mut next = layer.forward(&h);
            tanh_forward(&mut next);
            activations.push(h);
            h = next;
        }
        let mut mean = self.actor.forward(&h);
        tanh_forward(&mut mean);
        let value = self.critic.forward(&h)[0];
        activations.push(h);
        Forward { activations, mean, value }
    }

    /// Value estimate only.
    pub fn value(&self, obs: &[f32]) -> f32 {
        self.forward(obs).value
    }

    /// Accumulate into `grads` the gradient of a loss whose partial
    /// derivatives with respect to the action mean and the value are
    /// `d_mean` and `d_value`. The `log_std` gradient is left to the caller.
    pub fn backward(&self, fwd: &Forward, d_mean: &[f32], d_value: f32, grads: &mut Self) {
        let Some(h) = fwd.activations.last() else { return };
        let d_pre = tanh_backward(&fwd.mean, d_mean);
        let mut dh = self.actor.backward(h, &d_pre, &mut grads.actor);
        let dh_critic = self.critic.backward(h, &[d_value], &mut grads.critic);
        for (a, b) in dh.iter_mut().zip(dh_critic) {
            *a += b;
        }

        for (l, layer) in self.trunk.iter().enumerate().rev() {
            let d_pre = tanh_backward(&fwd.activations[l + 1], &dh);
            dh = layer.backward(&fwd.activations[l], &d_pre, &mut grads.trunk[l]);
        }
    }

    /// Every parameter block in a fixed order.
    pub fn slices(&self) -> Vec<&[f32]> {
        let mut out = Vec::with_capacity(2 * self.trunk.len() + 5);
        for l in &self.trunk {
            out.push(l.w.as_slice());
            out.push(l.b.as_slice());
        }
        out.extend([
            self.actor.w.as_slice(),
            self.actor.b.as_slice(),
            self.log_std.as_slice(),
            self.critic.w.as_slice(),
            self.critic.b.as_slice(),
        ]);
        out
    }

    pub fn slices_mut(&mut self) -> Vec<&mut [f32]> {
        let mut out = Vec::with_capacity(2 * self.trunk.len() + 5);
        for l in &mut self.trunk {
            out.push(l.w.as_mut_slice());
            out.push(l.b.as_mut_slice());
        }
        out.push(self.actor.w.as_mut_slice());
        out.push(self.actor.b.as_mut_slice());
        out.push(self.log_std.as_mut_slice());
        out.push(self.critic.w.as_mut_slice());
        out.push(self.critic.b.as_mut_slice());
        out
    }

    pub fn param_count(&self) -> usize {
        self.slices().iter().map(|s| s.len()).sum()
    }

    pub fn flatten(&self) -> Vec<f32> {
        self.slices().concat()
    }

    /// Raw bytes of every parameter, in [`slices`](Self::slices) order.
    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice::<f32, u8>(&self.flatten()).to_vec()
    }

    pub fn global_norm(&self) -> f32 {
        self.slices().iter().flat_map(|s| s.iter()).map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn scale(&mut self, factor: f32) {
        for s in self.slices_mut() {
            for v in s {
                *v *= factor;
            }
        }
    }

    pub fn add_assign(&mut self, other: &Self) {
        for (a, b) in self.slices_mut().into_iter().zip(other.slices()) {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y;
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.slices().iter().all(|s| s.iter().all(|v| v.is_finite()))
    }

    pub fn clamp_log_std(&mut self) {
        for v in &mut self.log_std {
            *v = v.clamp(LOG_STD_MIN, LOG_STD_MAX);
        }
    }
}
