use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    /// No record lies within the maximum lookup distance. The caller falls
    /// back to its own computation.
    #[error("no scenario within {max_distance} buckets (nearest: {nearest:?})")]
    NoCoverage { nearest: Option<f32>, max_distance: f32 },
    #[error("lookup exceeded its {budget_ms} ms budget")]
    QueryTimeout { budget_ms: f64 },
    #[error("scenario database checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },
    #[error("unsupported scenario database schema {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
    #[error("scenario database holds no records")]
    EmptyDatabase,
    #[error("invalid sampling grid: {0}")]
    InvalidGrid(String),
    #[error("corrupt scenario database: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode scenario database: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode scenario database: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl ScenarioError {
    /// `true` for the conditions where the caller should compute the answer
    /// itself rather than treat the lookup as broken.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::NoCoverage { .. } | Self::QueryTimeout { .. })
    }
}
