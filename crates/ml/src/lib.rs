#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::missing_panics_doc
)]
//! Small dense networks evaluated on the CPU with explicit backward passes.
//!
//! The actor-critic used by the trainer lives in [`PolicyParameters`]: a tanh
//! trunk shared by a Gaussian action head and a scalar value head. Gradients
//! are held in a second `PolicyParameters` of the same shape, and the Adam
//! moments in a separate [`AdamState`], so an update reads
//! `adam.step(&mut state, &mut params, &grads)`.

pub mod dense;
pub mod gaussian;
pub mod network;
pub mod optim;

pub use dense::{tanh_backward, tanh_forward, Dense};
pub use gaussian::{entropy, log_prob, sample_normal, LOG_STD_MAX, LOG_STD_MIN};
pub use network::{Forward, PolicyParameters};
pub use optim::{clip_grad_norm, Adam, AdamState};
