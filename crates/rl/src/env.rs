use serde::{Deserialize, Serialize};
use std::fmt;

/// Reinforcement learning environment.
///
/// Each call to [`step`](Env::step) advances the simulation by one action and
/// returns the new observation, the reward and, once the episode is over, its
/// terminal [`Outcome`].
pub trait Env {
    /// Advance by one action. `action` holds one value in `[-1, 1]` per
    /// action dimension.
    fn step(&mut self, action: &[f32]) -> Step;

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Vec<f32>;

    fn obs_size(&self) -> usize;

    fn action_size(&self) -> usize;
}

/// Result of one [`Env::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub obs: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    /// Set exactly when `done` is.
    pub outcome: Option<Outcome>,
}

/// How an episode ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    LapComplete,
    OffTrack,
    Stuck,
    MaxSteps,
    /// The physics step failed or left the valid state space.
    Diverged,
}

impl Outcome {
    pub const ALL: [Self; 5] = [Self::LapComplete, Self::OffTrack, Self::Stuck, Self::MaxSteps, Self::Diverged];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LapComplete => "lap_complete",
            Self::OffTrack => "off_track",
            Self::Stuck => "stuck",
            Self::MaxSteps => "max_steps",
            Self::Diverged => "diverged",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-outcome episode tally.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub lap_complete: usize,
    pub off_track: usize,
    pub stuck: usize,
    pub max_steps: usize,
    pub diverged: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::LapComplete => self.lap_complete += 1,
            Outcome::OffTrack => self.off_track += 1,
            Outcome::Stuck => self.stuck += 1,
            Outcome::MaxSteps => self.max_steps += 1,
            Outcome::Diverged => self.diverged += 1,
        }
    }

    #[must_use]
    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::LapComplete => self.lap_complete,
            Outcome::OffTrack => self.off_track,
            Outcome::Stuck => self.stuck,
            Outcome::MaxSteps => self.max_steps,
            Outcome::Diverged => self.diverged,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        Outcome::ALL.iter().map(|&o| self.get(o)).sum()
    }

    pub fn merge(&mut self, other: &Self) {
        self.lap_complete += other.lap_complete;
        self.off_track += other.off_track;
        self.stuck += other.stuck;
        self.max_steps += other.max_steps;
        self.diverged += other.diverged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up() {
        let mut counts = OutcomeCounts::default();
        for o in Outcome::ALL {
            counts.record(o);
        }
        counts.record(Outcome::OffTrack);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.get(Outcome::OffTrack), 2);

        let mut merged = counts;
        merged.merge(&counts);
        assert_eq!(merged.total(), 12);
    }
}
