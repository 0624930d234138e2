//! The scenario database artifact.
//!
//! One file holds the metadata and every record, MessagePack encoded and
//! LZ4 compressed. The metadata carries a SHA-256 checksum of the encoded
//! record payload, verified on every load.

use crate::compiler::{CompilerConfig, PolicySource};
use crate::error::ScenarioError;
use crate::key::SamplingGrid;
use crate::record::ScenarioRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;
use track::TrackGeometry;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMeta {
    pub schema_version: u32,
    /// RFC 3339.
    pub built_at: String,
    pub track: String,
    pub track_length: f32,
    pub grid: SamplingGrid,
    pub seed: u64,
    pub rollout_steps: u32,
    pub policy: String,
    pub source_checkpoint: Option<String>,
    pub records: usize,
    /// Fraction of position buckets with at least one converged record.
    pub position_coverage: f32,
    /// SHA-256 of the MessagePack record payload, hex encoded.
    pub checksum: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDatabase {
    pub meta: DatabaseMeta,
    pub records: Vec<ScenarioRecord>,
}

/// Checksum over the encoded records.
///
/// # Errors
///
/// MessagePack encoding failure.
pub fn checksum(records: &[ScenarioRecord]) -> Result<String, ScenarioError> {
    let payload = rmp_serde::to_vec(records)?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(format!("{:x}", hasher.finalize()))
}

impl ScenarioDatabase {
    /// Stamp `records` with build metadata and their checksum.
    ///
    /// # Errors
    ///
    /// MessagePack encoding failure while checksumming.
    pub fn new(
        track: &TrackGeometry,
        config: &CompilerConfig,
        source: &PolicySource,
        position_coverage: f32,
        records: Vec<ScenarioRecord>,
    ) -> Result<Self, ScenarioError> {
        let meta = DatabaseMeta {
            schema_version: SCHEMA_VERSION,
            built_at: chrono::Utc::now().to_rfc3339(),
            track: track.name().to_string(),
            track_length: track.length(),
            grid: config.grid.clone(),
            seed: config.seed,
            rollout_steps: config.rollout_steps,
            policy: source.name.clone(),
            source_checkpoint: source.checkpoint.clone(),
            records: records.len(),
            position_coverage,
            checksum: checksum(&records)?,
        };
        Ok(Self { meta, records })
    }

    /// Check the schema version and the payload checksum.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::UnsupportedSchema`], [`ScenarioError::ChecksumMismatch`]
    /// or a record count that disagrees with the metadata.
    pub fn verify(&self) -> Result<(), ScenarioError> {
        if self.meta.schema_version != SCHEMA_VERSION {
            return Err(ScenarioError::UnsupportedSchema {
                found: self.meta.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        let computed = checksum(&self.records)?;
        if computed != self.meta.checksum {
            return Err(ScenarioError::ChecksumMismatch { stored: self.meta.checksum.clone(), computed });
        }
        if self.records.len() != self.meta.records {
            return Err(ScenarioError::Corrupt(format!(
                "metadata lists {} records, payload holds {}",
                self.meta.records,
                self.records.len()
            )));
        }
        Ok(())
    }

    /// Encode as stored. The checksum is not recomputed.
    ///
    /// # Errors
    ///
    /// MessagePack encoding failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ScenarioError> {
        let packed = rmp_serde::to_vec(self)?;
        Ok(lz4_flex::compress_prepend_size(&packed))
    }

    /// Decode and verify.
    ///
    /// # Errors
    ///
    /// Corrupt compression, an undecodable payload or a failed
    /// [`verify`](Self::verify).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScenarioError> {
        let packed = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| ScenarioError::Corrupt(format!("failed to decompress: {e}")))?;
        let database: Self = rmp_serde::from_slice(&packed)?;
        database.verify()?;
        Ok(database)
    }

    /// Write to `path`, replacing any previous database in one rename so
    /// readers never see a partial file. Returns the bytes written.
    ///
    /// # Errors
    ///
    /// Encoding or I/O failure.
    pub fn save(&self, path: &Path) -> Result<u64, ScenarioError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.to_bytes()?;
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, path)?;
        info!(
            path = %path.display(),
            records = self.records.len(),
            bytes = bytes.len(),
            checksum = %self.meta.checksum,
            "scenario database written"
        );
        Ok(bytes.len() as u64)
    }

    /// # Errors
    ///
    /// See [`from_bytes`](Self::from_bytes).
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        Self::from_bytes(&fs::read(path)?)
    }
}
