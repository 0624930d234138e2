use serde::{Deserialize, Serialize};

/// A fully connected layer. `w` is row-major `[out_dim, in_dim]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub w: Vec<f32>,
    pub b: Vec<f32>,
    pub in_dim: usize,
    pub out_dim: usize,
}

impl Dense {
    pub fn new(weights: Vec<f32>, bias: Vec<f32>, in_dim: usize, out_dim: usize) -> Self {
        assert_eq!(weights.len(), in_dim * out_dim);
        assert_eq!(bias.len(), out_dim);
        Self { w: weights, b: bias, in_dim, out_dim }
    }

    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self::new(vec![0.0; in_dim * out_dim], vec![0.0; out_dim], in_dim, out_dim)
    }

    /// Glorot-uniform weights scaled by `gain`, zero bias.
    pub fn xavier(in_dim: usize, out_dim: usize, gain: f32, rng: &mut fastrand::Rng) -> Self {
        let limit = gain * (6.0 / (in_dim + out_dim) as f32).sqrt();
        let weights = (0..in_dim * out_dim).map(|_| (rng.f32() * 2.0 - 1.0) * limit).collect();
        Self::new(weights, vec![0.0; out_dim], in_dim, out_dim)
    }

    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        (0..self.out_dim)
            .map(|o| {
                let row = &self.w[o * self.in_dim..(o + 1) * self.in_dim];
                self.b[o] + row.iter().zip(x).map(|(w, x)| w * x).sum::<f32>()
            })
            .collect()
    }

    /// Accumulate parameter gradients into `grads` and return the gradient
    /// with respect to the input.
    pub fn backward(&self, x: &[f32], grad: &[f32], grads: &mut Dense) -> Vec<f32> {
        let mut grad_input = vec![0.0; self.in_dim];
        for o in 0..self.out_dim {
            let go = grad[o];
            if go == 0.0 {
                continue;
            }
            let base = o * self.in_dim;
            for i in 0..self.in_dim {
                grads.w[base + i] += go * x[i];
                grad_input[i] += self.w[base + i] * go;
            }
            grads.b[o] += go;
        }
        grad_input
    }

    pub fn param_count(&self) -> usize {
        self.w.len() + self.b.len()
    }
}

pub fn tanh_forward(x: &mut [f32]) {
    for v in x {
        *v = v.tanh();
    }
}

/// Gradient through tanh given the activation output.
pub fn tanh_backward(output: &[f32], grad: &[f32]) -> Vec<f32> {
    output.iter().zip(grad).map(|(&t, &g)| g * (1.0 - t * t)).collect()
}
