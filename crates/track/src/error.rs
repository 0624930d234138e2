use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    /// The description cannot form a usable track. Raised at load time only.
    #[error("invalid track data: {0}")]
    InvalidTrackData(String),
    #[error("failed to read track data")]
    Io(#[from] std::io::Error),
    #[error("malformed track JSON")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn invalid(msg: impl Into<String>) -> TrackError {
    TrackError::InvalidTrackData(msg.into())
}
