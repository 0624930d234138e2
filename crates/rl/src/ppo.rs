//! Proximal Policy Optimization over parallel racing environments.
//!
//! Each iteration collects a fixed number of steps split across workers,
//! estimates advantages with GAE and runs several epochs of clipped
//! surrogate updates over shuffled minibatches. The update waits for every
//! worker's rollout.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::env::{Env, Outcome, OutcomeCounts};
use crate::error::TrainError;
use crate::policy::check_racing_network;
use crate::racing::{EnvConfig, RacingEnv, ACTION_SIZE, OBS_SIZE};
use ml::{clip_grad_norm, entropy, log_prob, sample_normal, Adam, AdamState, PolicyParameters};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use track::TrackGeometry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub learning_rate: f32,
    /// Discount factor.
    pub gamma: f32,
    /// GAE smoothing.
    pub lambda: f32,
    /// Ratio clip range ε.
    pub clip: f32,
    pub entropy_coef: f32,
    pub value_coef: f32,
    pub epochs: usize,
    pub minibatch: usize,
    /// Global gradient-norm ceiling.
    pub max_grad_norm: f32,
    pub initial_log_std: f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            gamma: 0.99,
            lambda: 0.95,
            clip: 0.2,
            entropy_coef: 0.01,
            value_coef: 0.5,
            epochs: 4,
            minibatch: 64,
            max_grad_norm: 0.5,
            initial_log_std: -0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub hyperparameters: Hyperparameters,
    /// Widths of the tanh trunk layers.
    pub hidden: Vec<usize>,
    /// Steps per iteration, summed over workers.
    pub rollout_steps: usize,
    pub workers: usize,
    pub seed: u64,
    /// Finished episodes between checkpoints.
    pub checkpoint_every: u64,
    /// Where checkpoints are written. In memory only when unset.
    pub checkpoint_dir: Option<PathBuf>,
    /// Episodes in the reward moving average.
    pub reward_window: usize,
    /// Fraction of the best checkpoint's score the moving average may lose
    /// before an iteration counts as a regression.
    pub regression_tolerance: f32,
    /// Consecutive regressing iterations that trigger a rollback.
    pub rollback_patience: u32,
    /// Consecutive stalled iterations [`PpoTrainer::train`] tolerates.
    pub max_stalls: u32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hyperparameters: Hyperparameters::default(),
            hidden: vec![64, 64],
            rollout_steps: 2048,
            workers: 4,
            seed: 0,
            checkpoint_every: 100,
            checkpoint_dir: None,
            reward_window: 20,
            regression_tolerance: 0.25,
            rollback_patience: 3,
            max_stalls: 3,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub iteration: u64,
    /// Parameter version after the update.
    pub version: u64,
    pub steps: usize,
    /// Episodes finished during the rollout.
    pub episodes: usize,
    pub outcomes: OutcomeCounts,
    pub mean_episode_reward: Option<f32>,
    pub moving_average: Option<f32>,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub approx_kl: f32,
    pub clip_fraction: f32,
    /// Id of the checkpoint written this iteration.
    pub checkpoint: Option<String>,
    /// Id of the checkpoint restored this iteration.
    pub rolled_back_to: Option<String>,
}

/// Generalized advantage estimation over one worker's trajectory.
///
/// `dones[t]` marks that the episode ended after step `t`; `last_value`
/// bootstraps the step after the final one. Returns `(advantages, returns)`.
#[must_use]
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    let mut advantages = vec![0.0; n];
    let mut running = 0.0;
    for t in (0..n).rev() {
        let next_value = if t + 1 < n { values[t + 1] } else { last_value };
        let live = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * live - values[t];
        running = delta + gamma * lambda * live * running;
        advantages[t] = running;
    }
    let returns = advantages.iter().zip(values).map(|(a, v)| a + v).collect();
    (advantages, returns)
}

/// Tracks the best checkpoint score and decides when the moving average has
/// regressed for long enough to roll back.
#[derive(Clone, Debug, PartialEq)]
pub struct RegressionMonitor {
    tolerance: f32,
    patience: u32,
    best: Option<f32>,
    strikes: u32,
}

impl RegressionMonitor {
    #[must_use]
    pub fn new(tolerance: f32, patience: u32) -> Self {
        Self { tolerance, patience: patience.max(1), best: None, strikes: 0 }
    }

    /// Returns `true` when `score` beats every earlier checkpoint.
    pub fn record_checkpoint(&mut self, score: f32) -> bool {
        if self.best.map_or(true, |best| score > best) {
            self.best = Some(score);
            true
        } else {
            false
        }
    }

    /// Feed the latest moving average. Returns `true` when a rollback is due;
    /// the strike count restarts afterwards.
    pub fn observe(&mut self, average: f32) -> bool {
        let Some(best) = self.best else { return false };
        if average < best - self.tolerance * best.abs().max(1.0) {
            self.strikes += 1;
        } else {
            self.strikes = 0;
        }
        if self.strikes >= self.patience {
            self.strikes = 0;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn best(&self) -> Option<f32> {
        self.best
    }
}

/// One worker's share of a rollout.
#[derive(Default)]
struct Rollout {
    obs: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    log_probs: Vec<f32>,
    values: Vec<f32>,
    rewards: Vec<f32>,
    dones: Vec<bool>,
    last_value: f32,
    /// Total reward and outcome of every episode that ended.
    finished: Vec<(f32, Outcome)>,
}

struct Worker {
    env: RacingEnv,
    rng: fastrand::Rng,
    obs: Vec<f32>,
    episode_reward: f32,
}

impl Worker {
    fn new(track: Arc<TrackGeometry>, config: EnvConfig, seed: u64) -> Self {
        let mut env = RacingEnv::new(track, config);
        let obs = env.reset();
        Self { env, rng: fastrand::Rng::with_seed(seed), obs, episode_reward: 0.0 }
    }

    fn collect(&mut self, params: &PolicyParameters, steps: usize) -> Rollout {
        let mut out = Rollout::default();
        for _ in 0..steps {
            let fwd = params.forward(&self.obs);
            let action: Vec<f32> = fwd
                .mean
                .iter()
                .zip(&params.log_std)
                .map(|(m, ls)| m + ls.exp() * sample_normal(&mut self.rng))
                .collect();
            let lp = log_prob(&action, &fwd.mean, &params.log_std);
            let step = self.env.step(&action);
            self.episode_reward += step.reward;

            out.obs.push(std::mem::replace(&mut self.obs, step.obs));
            out.actions.push(action);
            out.log_probs.push(lp);
            out.values.push(fwd.value);
            out.rewards.push(step.reward);
            out.dones.push(step.done);

            if let Some(outcome) = step.outcome {
                out.finished.push((self.episode_reward, outcome));
                self.episode_reward = 0.0;
                self.obs = self.env.reset();
            }
        }
        out.last_value = params.value(&self.obs);
        out
    }
}

/// Flattened training data for one update.
struct Batch {
    obs: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    log_probs: Vec<f32>,
    advantages: Vec<f32>,
    returns: Vec<f32>,
}

#[derive(Default)]
struct UpdateStats {
    policy_loss: f32,
    value_loss: f32,
    approx_kl: f32,
    clip_fraction: f32,
}

pub struct PpoTrainer {
    config: TrainerConfig,
    params: PolicyParameters,
    adam: Adam,
    adam_state: AdamState,
    workers: Vec<Worker>,
    rng: fastrand::Rng,
    store: Option<CheckpointStore>,
    iteration: u64,
    episodes: u64,
    next_checkpoint: u64,
    slot: u64,
    rewards: VecDeque<f32>,
    monitor: RegressionMonitor,
    best: Option<Checkpoint>,
    latest: Option<Checkpoint>,
}

impl PpoTrainer {
    /// A trainer with freshly initialized parameters.
    ///
    /// # Errors
    ///
    /// [`TrainError::Config`] for an unusable configuration, or I/O failure
    /// opening the checkpoint directory.
    pub fn new(track: Arc<TrackGeometry>, env: EnvConfig, config: TrainerConfig) -> Result<Self, TrainError> {
        let params = PolicyParameters::new(
            OBS_SIZE,
            &config.hidden,
            ACTION_SIZE,
            config.hyperparameters.initial_log_std,
            config.seed,
        );
        Self::with_params(track, env, config, params)
    }

    /// Continue training from a checkpoint.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus a checkpoint whose network does not fit
    /// the racing observation.
    pub fn resume(
        track: Arc<TrackGeometry>,
        env: EnvConfig,
        mut config: TrainerConfig,
        checkpoint: &Checkpoint,
    ) -> Result<Self, TrainError> {
        checkpoint.verify()?;
        config.hidden.clone_from(&checkpoint.hidden);
        let mut trainer = Self::with_params(track, env, config, checkpoint.params.clone())?;
        trainer.iteration = checkpoint.iteration;
        trainer.episodes = checkpoint.episodes;
        trainer.next_checkpoint = trainer.following_checkpoint();
        trainer.slot = trainer.slot.max(checkpoint.slot + 1);
        info!(id = %checkpoint.id, version = checkpoint.params.version, "resuming from checkpoint");
        Ok(trainer)
    }

    fn with_params(
        track: Arc<TrackGeometry>,
        env: EnvConfig,
        config: TrainerConfig,
        params: PolicyParameters,
    ) -> Result<Self, TrainError> {
        validate(&config)?;
        env.validate()?;
        check_racing_network(&params)?;
        let store = config.checkpoint_dir.as_ref().map(CheckpointStore::open).transpose()?;
        let slot = match &store {
            Some(store) => store.next_slot()?,
            None => 0,
        };
        let workers = (0..config.workers)
            .map(|i| Worker::new(Arc::clone(&track), env.clone(), worker_seed(config.seed, i)))
            .collect();
        let adam = Adam::with_lr(config.hyperparameters.learning_rate);
        let adam_state = AdamState::new(&params);
        let monitor = RegressionMonitor::new(config.regression_tolerance, config.rollback_patience);
        Ok(Self {
            rng: fastrand::Rng::with_seed(config.seed ^ 0x5EED_0F_9A7E),
            next_checkpoint: config.checkpoint_every.max(1),
            rewards: VecDeque::with_capacity(config.reward_window),
            config,
            params,
            adam,
            adam_state,
            workers,
            store,
            iteration: 0,
            episodes: 0,
            slot,
            monitor,
            best: None,
            latest: None,
        })
    }

    #[must_use]
    pub fn params(&self) -> &PolicyParameters {
        &self.params
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Episodes finished over the trainer's lifetime.
    #[must_use]
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    #[must_use]
    pub fn latest_checkpoint(&self) -> Option<&Checkpoint> {
        self.latest.as_ref()
    }

    #[must_use]
    pub fn best_checkpoint(&self) -> Option<&Checkpoint> {
        self.best.as_ref()
    }

    /// Mean reward of the most recent episodes.
    #[must_use]
    pub fn moving_average(&self) -> Option<f32> {
        (!self.rewards.is_empty()).then(|| self.rewards.iter().sum::<f32>() / self.rewards.len() as f32)
    }

    /// Run `iterations` iterations, reporting each.
    ///
    /// A stalled iteration is skipped; [`TrainingStalled`](TrainError::TrainingStalled)
    /// is returned once `max_stalls` happen in a row.
    ///
    /// # Errors
    ///
    /// Repeated stalls or a checkpoint failure.
    pub fn train(
        &mut self,
        iterations: u64,
        mut on_report: impl FnMut(&IterationReport),
    ) -> Result<Vec<IterationReport>, TrainError> {
        let mut reports = Vec::new();
        let mut stalls = 0;
        for _ in 0..iterations {
            match self.iterate() {
                Ok(report) => {
                    stalls = 0;
                    on_report(&report);
                    reports.push(report);
                }
                Err(err @ TrainError::TrainingStalled { .. }) => {
                    stalls += 1;
                    if stalls >= self.config.max_stalls {
                        error!(stalls, "giving up after consecutive stalled iterations");
                        return Err(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reports)
    }

    /// Collect one rollout and update the network.
    ///
    /// # Errors
    ///
    /// [`TrainError::TrainingStalled`] when every episode finished in the
    /// rollout diverged; parameters and checkpoints are left untouched.
    /// Checkpoint write failures are also returned.
    pub fn iterate(&mut self) -> Result<IterationReport, TrainError> {
        self.iteration += 1;
        let iteration = self.iteration;
        let per_worker = self.config.rollout_steps.div_ceil(self.workers.len());

        let params = &self.params;
        let rollouts: Vec<Rollout> = self.workers.par_iter_mut().map(|w| w.collect(params, per_worker)).collect();

        let finished: Vec<(f32, Outcome)> = rollouts.iter().flat_map(|r| r.finished.iter().copied()).collect();
        if !finished.is_empty() && finished.iter().all(|(_, o)| *o == Outcome::Diverged) {
            warn!(iteration, episodes = finished.len(), "every episode diverged; skipping the update");
            return Err(TrainError::TrainingStalled { iteration, episodes: finished.len() });
        }

        let batch = self.build_batch(rollouts);
        let snapshot = (self.params.clone(), self.adam_state.clone());
        let stats = self.update(&batch);
        if !self.params.is_finite() {
            warn!(iteration, "update produced non-finite parameters; restoring");
            (self.params, self.adam_state) = snapshot;
        }

        let mut outcomes = OutcomeCounts::default();
        for &(reward, outcome) in &finished {
            outcomes.record(outcome);
            if self.rewards.len() == self.config.reward_window.max(1) {
                self.rewards.pop_front();
            }
            self.rewards.push_back(reward);
        }
        self.episodes += finished.len() as u64;
        let mean_episode_reward =
            (!finished.is_empty()).then(|| finished.iter().map(|f| f.0).sum::<f32>() / finished.len() as f32);
        let moving_average = self.moving_average();

        let mut report = IterationReport {
            iteration,
            version: self.params.version,
            steps: batch.obs.len(),
            episodes: finished.len(),
            outcomes,
            mean_episode_reward,
            moving_average,
            policy_loss: stats.policy_loss,
            value_loss: stats.value_loss,
            entropy: entropy(&self.params.log_std),
            approx_kl: stats.approx_kl,
            clip_fraction: stats.clip_fraction,
            checkpoint: None,
            rolled_back_to: None,
        };

        if self.episodes >= self.next_checkpoint {
            report.checkpoint = Some(self.checkpoint()?.id);
            self.next_checkpoint = self.following_checkpoint();
        }
        if let Some(average) = moving_average {
            if self.monitor.observe(average) {
                report.rolled_back_to = self.rollback();
            }
        }

        info!(
            iteration,
            version = report.version,
            episodes = report.episodes,
            laps = outcomes.lap_complete,
            off_track = outcomes.off_track,
            mean_reward = ?report.mean_episode_reward,
            moving_average = ?report.moving_average,
            policy_loss = report.policy_loss,
            value_loss = report.value_loss,
            approx_kl = report.approx_kl,
            "iteration complete"
        );
        Ok(report)
    }

    fn following_checkpoint(&self) -> u64 {
        let every = self.config.checkpoint_every.max(1);
        (self.episodes / every + 1) * every
    }

    /// Snapshot the current parameters into the next slot.
    ///
    /// # Errors
    ///
    /// Checkpoint write failure.
    pub fn checkpoint(&mut self) -> Result<Checkpoint, TrainError> {
        let checkpoint = Checkpoint::new(
            self.slot,
            self.params.clone(),
            self.config.hyperparameters.clone(),
            self.config.hidden.clone(),
            self.iteration,
            self.episodes,
            self.moving_average(),
        );
        if let Some(store) = &self.store {
            store.write(&checkpoint)?;
        }
        self.slot += 1;
        if let Some(score) = checkpoint.score {
            if self.monitor.record_checkpoint(score) {
                debug!(id = %checkpoint.id, score, "new best checkpoint");
                self.best = Some(checkpoint.clone());
            }
        }
        self.latest = Some(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Restore the best checkpoint's parameters. The version counter keeps
    /// counting forward and the optimizer moments restart.
    fn rollback(&mut self) -> Option<String> {
        let best = self.best.as_ref()?;
        warn!(
            id = %best.id,
            score = ?best.score,
            moving_average = ?self.moving_average(),
            "reward regressed; rolling back"
        );
        let version = self.params.version;
        self.params = best.params.clone();
        self.params.version = version;
        self.adam_state = AdamState::new(&self.params);
        self.rewards.clear();
        Some(best.id.clone())
    }

    fn build_batch(&self, rollouts: Vec<Rollout>) -> Batch {
        let h = &self.config.hyperparameters;
        let total = rollouts.iter().map(|r| r.rewards.len()).sum();
        let mut batch = Batch {
            obs: Vec::with_capacity(total),
            actions: Vec::with_capacity(total),
            log_probs: Vec::with_capacity(total),
            advantages: Vec::with_capacity(total),
            returns: Vec::with_capacity(total),
        };
        for r in rollouts {
            let (advantages, returns) = compute_gae(&r.rewards, &r.values, &r.dones, r.last_value, h.gamma, h.lambda);
            batch.obs.extend(r.obs);
            batch.actions.extend(r.actions);
            batch.log_probs.extend(r.log_probs);
            batch.advantages.extend(advantages);
            batch.returns.extend(returns);
        }

        let n = batch.advantages.len().max(1) as f32;
        let mean = batch.advantages.iter().sum::<f32>() / n;
        let std = (batch.advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n).sqrt();
        for a in &mut batch.advantages {
            *a = (*a - mean) / (std + 1e-8);
        }
        batch
    }

    fn update(&mut self, batch: &Batch) -> UpdateStats {
        let h = &self.config.hyperparameters;
        let mut indices: Vec<usize> = (0..batch.obs.len()).collect();
        let mut stats = UpdateStats::default();
        let mut seen = 0_usize;

        for _ in 0..h.epochs {
            self.rng.shuffle(&mut indices);
            for chunk in indices.chunks(h.minibatch.max(1)) {
                let scale = 1.0 / chunk.len() as f32;
                let mut grads = self.params.zeros_like();
                for &i in chunk {
                    let fwd = self.params.forward(&batch.obs[i]);
                    let action = &batch.actions[i];
                    let lp = log_prob(action, &fwd.mean, &self.params.log_std);
                    let ratio = (lp - batch.log_probs[i]).exp();
                    let advantage = batch.advantages[i];
                    let unclipped = ratio * advantage;
                    let clipped = ratio.clamp(1.0 - h.clip, 1.0 + h.clip) * advantage;
                    // the clipped branch has no gradient
                    let d_log_prob = if unclipped <= clipped { -advantage * ratio } else { 0.0 };

                    let mut d_mean = Vec::with_capacity(action.len());
                    for (k, (&a, &m)) in action.iter().zip(&fwd.mean).enumerate() {
                        let var = (2.0 * self.params.log_std[k]).exp();
                        d_mean.push(d_log_prob * (a - m) / var * scale);
                        let z2 = (a - m) * (a - m) / var;
                        grads.log_std[k] += (d_log_prob * (z2 - 1.0) - h.entropy_coef) * scale;
                    }
                    let value_error = fwd.value - batch.returns[i];
                    let d_value = 2.0 * h.value_coef * value_error * scale;
                    self.params.backward(&fwd, &d_mean, d_value, &mut grads);

                    stats.policy_loss -= unclipped.min(clipped);
                    stats.value_loss += value_error * value_error;
                    stats.approx_kl += batch.log_probs[i] - lp;
                    if (ratio - 1.0).abs() > h.clip {
                        stats.clip_fraction += 1.0;
                    }
                    seen += 1;
                }
                clip_grad_norm(&mut grads, h.max_grad_norm);
                self.adam.step(&mut self.adam_state, &mut self.params, &grads);
                self.params.clamp_log_std();
            }
        }

        if seen > 0 {
            let n = seen as f32;
            stats.policy_loss /= n;
            stats.value_loss /= n;
            stats.approx_kl /= n;
            stats.clip_fraction /= n;
        }
        stats
    }
}

fn worker_seed(seed: u64, worker: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(worker as u64 + 1)
}

fn validate(config: &TrainerConfig) -> Result<(), TrainError> {
    let h = &config.hyperparameters;
    if config.workers == 0 {
        return Err(TrainError::Config("at least one worker is required".into()));
    }
    if config.rollout_steps < config.workers {
        return Err(TrainError::Config(format!(
            "rollout of {} steps cannot be split across {} workers",
            config.rollout_steps, config.workers
        )));
    }
    if h.minibatch == 0 || h.epochs == 0 {
        return Err(TrainError::Config("epochs and minibatch size must be positive".into()));
    }
    if !(h.clip > 0.0 && h.clip < 1.0) {
        return Err(TrainError::Config(format!("clip range {} outside (0, 1)", h.clip)));
    }
    if !(0.0..=1.0).contains(&h.gamma) || !(0.0..=1.0).contains(&h.lambda) {
        return Err(TrainError::Config("gamma and lambda must lie in [0, 1]".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gae_without_discount_is_reward_minus_value() {
        let (adv, ret) = compute_gae(&[1.0, 2.0], &[0.5, 0.5], &[false, true], 10.0, 0.0, 0.0);
        assert_eq!(adv, vec![0.5, 1.5]);
        assert_eq!(ret, vec![1.0, 2.0]);
    }

    #[test]
    fn gae_stops_at_episode_boundaries() {
        // the bootstrap value must not leak across the done flag
        let (adv, _) = compute_gae(&[0.0, 1.0], &[0.0, 0.0], &[false, true], 100.0, 1.0, 1.0);
        assert_eq!(adv, vec![1.0, 1.0]);
    }

    #[test]
    fn gae_bootstraps_an_unfinished_trajectory() {
        let (adv, ret) = compute_gae(&[1.0], &[0.0], &[false], 2.0, 0.5, 1.0);
        assert_eq!(adv, vec![2.0]);
        assert_eq!(ret, vec![2.0]);
    }

    #[test]
    fn regression_needs_patience() {
        let mut m = RegressionMonitor::new(0.25, 2);
        assert!(!m.observe(-100.0), "no checkpoint yet");
        assert!(m.record_checkpoint(40.0));
        assert!(!m.record_checkpoint(30.0));
        assert!(!m.observe(35.0));
        assert!(!m.observe(20.0));
        assert!(m.observe(20.0));
        assert!(!m.observe(20.0), "strikes restart after a rollback");
        assert_eq!(m.best(), Some(40.0));
    }

    #[test]
    fn config_validation() {
        let mut c = TrainerConfig::default();
        assert!(validate(&c).is_ok());
        c.workers = 0;
        assert!(validate(&c).is_err());
        c = TrainerConfig { rollout_steps: 2, workers: 4, ..TrainerConfig::default() };
        assert!(validate(&c).is_err());
        c = TrainerConfig::default();
        c.hyperparameters.clip = 0.0;
        assert!(validate(&c).is_err());
    }
}
