use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    /// Every episode finished during the rollout ended in divergence.
    #[error("training stalled at iteration {iteration}: all {episodes} finished episodes diverged")]
    TrainingStalled { iteration: u64, episodes: usize },
    #[error("invalid checkpoint: {0}")]
    Checkpoint(String),
    #[error("checkpoint {} already exists", .0.display())]
    CheckpointExists(PathBuf),
    #[error("invalid trainer configuration: {0}")]
    Config(String),
    #[error("invalid race strategy: {0}")]
    Strategy(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode checkpoint: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
