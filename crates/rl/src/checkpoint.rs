//! Immutable policy checkpoints.
//!
//! A checkpoint is MessagePack, LZ4-compressed, in a file named after its
//! slot. Slots are written once: an existing file is never overwritten.

use crate::error::TrainError;
use crate::ppo::Hyperparameters;
use ml::PolicyParameters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSION: &str = "ckpt";

/// SHA-256 of the parameter bytes, hex encoded.
#[must_use]
pub fn fingerprint(params: &PolicyParameters) -> String {
    let mut hasher = Sha256::new();
    hasher.update(params.to_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// `<slot>-<fingerprint prefix>`.
    pub id: String,
    pub slot: u64,
    pub fingerprint: String,
    /// RFC 3339.
    pub created_at: String,
    pub iteration: u64,
    /// Episodes finished when the checkpoint was taken.
    pub episodes: u64,
    /// Moving-average episode reward at write time.
    pub score: Option<f32>,
    pub hyperparameters: Hyperparameters,
    pub hidden: Vec<usize>,
    pub params: PolicyParameters,
}

impl Checkpoint {
    #[must_use]
    pub fn new(
        slot: u64,
        params: PolicyParameters,
        hyperparameters: Hyperparameters,
        hidden: Vec<usize>,
        iteration: u64,
        episodes: u64,
        score: Option<f32>,
    ) -> Self {
        let fingerprint = fingerprint(&params);
        Self {
            id: format!("{slot:06}-{}", &fingerprint[..12]),
            slot,
            fingerprint,
            created_at: chrono::Utc::now().to_rfc3339(),
            iteration,
            episodes,
            score,
            hyperparameters,
            hidden,
            params,
        }
    }

    /// # Errors
    ///
    /// [`TrainError::Checkpoint`] when the stored fingerprint does not match
    /// the parameters.
    pub fn verify(&self) -> Result<(), TrainError> {
        let actual = fingerprint(&self.params);
        if actual == self.fingerprint {
            Ok(())
        } else {
            Err(TrainError::Checkpoint(format!(
                "fingerprint mismatch for {}: stored {}, computed {actual}",
                self.id, self.fingerprint
            )))
        }
    }

    /// # Errors
    ///
    /// MessagePack encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TrainError> {
        let packed = rmp_serde::to_vec(self)?;
        Ok(lz4_flex::compress_prepend_size(&packed))
    }

    /// Decode and verify.
    ///
    /// # Errors
    ///
    /// Corrupt compression, undecodable payload, or a fingerprint mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrainError> {
        let packed = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| TrainError::Checkpoint(format!("failed to decompress: {e}")))?;
        let checkpoint: Self = rmp_serde::from_slice(&packed)?;
        checkpoint.verify()?;
        Ok(checkpoint)
    }

    /// # Errors
    ///
    /// See [`from_bytes`](Self::from_bytes).
    pub fn load(path: &Path) -> Result<Self, TrainError> {
        Self::from_bytes(&fs::read(path)?)
    }
}

/// A directory of checkpoint slots.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// The directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TrainError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, slot: u64) -> PathBuf {
        self.dir.join(format!("policy-{slot:06}.{EXTENSION}"))
    }

    /// Write a checkpoint into its slot.
    ///
    /// # Errors
    ///
    /// [`TrainError::CheckpointExists`] when the slot is taken, otherwise
    /// I/O or encoding failures.
    pub fn write(&self, checkpoint: &Checkpoint) -> Result<PathBuf, TrainError> {
        let path = self.path_for(checkpoint.slot);
        let bytes = checkpoint.to_bytes()?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                TrainError::CheckpointExists(path.clone())
            } else {
                TrainError::Io(e)
            }
        })?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        info!(id = %checkpoint.id, path = %path.display(), bytes = bytes.len(), "checkpoint written");
        Ok(path)
    }

    /// Occupied slots in ascending order.
    ///
    /// # Errors
    ///
    /// The directory cannot be listed.
    pub fn slots(&self) -> Result<Vec<u64>, TrainError> {
        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let slot = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("policy-"))
                .and_then(|s| s.parse().ok());
            if let Some(slot) = slot {
                slots.push(slot);
            }
        }
        slots.sort_unstable();
        Ok(slots)
    }

    /// The first free slot after every occupied one.
    ///
    /// # Errors
    ///
    /// The directory cannot be listed.
    pub fn next_slot(&self) -> Result<u64, TrainError> {
        Ok(self.slots()?.last().map_or(0, |s| s + 1))
    }

    /// # Errors
    ///
    /// See [`Checkpoint::load`].
    pub fn read(&self, slot: u64) -> Result<Checkpoint, TrainError> {
        Checkpoint::load(&self.path_for(slot))
    }

    /// The checkpoint in the highest slot, if any.
    ///
    /// # Errors
    ///
    /// See [`Checkpoint::load`].
    pub fn latest(&self) -> Result<Option<Checkpoint>, TrainError> {
        match self.slots()?.last() {
            Some(&slot) => self.read(slot).map(Some),
            None => Ok(None),
        }
    }
}
