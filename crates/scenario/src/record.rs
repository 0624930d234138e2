use crate::key::ScenarioKey;
use physics::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Every rollout behind the record stayed on track.
    Converged,
    /// At least one rollout left the track, got stuck or diverged.
    Degraded,
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "converged",
            Self::Degraded => "degraded",
        })
    }
}

/// One compiled situation and what to do in it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub key: ScenarioKey,
    pub action: Action,
    /// Seconds lost (positive) or gained against the reference profile over
    /// the rollout window.
    pub predicted_delta: f32,
    pub coverage: Coverage,
    /// Rollouts merged into the record.
    pub samples: u32,
}

/// Lookup answer. Always carries its confidence and coverage so a blended or
/// distant match is never mistaken for an exact one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub predicted_delta: f32,
    /// `exp(-distance / decay)`, halved when any contributing record is
    /// degraded.
    pub confidence: f32,
    pub coverage: Coverage,
    /// The query sat exactly on a compiled key.
    pub exact: bool,
    /// Bucket distance to the nearest record.
    pub distance: f32,
    /// Records blended into the answer.
    pub neighbors: usize,
    pub nearest: ScenarioKey,
}
