use crate::error::{invalid, TrackError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Sign of the line curvature through the turn: +1 for left, -1 for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }

    #[must_use]
    pub fn from_curvature(curvature: f32) -> Self {
        if curvature >= 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// One entry of the turn registry. Distances are meters along the line,
/// speeds are km/h.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    pub brake_distance: f32,
    pub apex_distance: f32,
    pub apex_speed: f32,
    pub exit_distance: f32,
    pub exit_speed: f32,
    pub direction: TurnDirection,
}

impl Turn {
    /// Check the ordering `brake < apex < exit` and that the turn lies on a
    /// line of length `track_length`.
    ///
    /// # Errors
    ///
    /// [`TrackError::InvalidTrackData`] naming the offending turn.
    pub fn validate(&self, track_length: f32) -> Result<(), TrackError> {
        let label = self.label();
        let fields = [
            self.brake_distance,
            self.apex_distance,
            self.apex_speed,
            self.exit_distance,
            self.exit_speed,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(invalid(format!("{label}: non-finite field")));
        }
        if !(self.brake_distance < self.apex_distance && self.apex_distance < self.exit_distance) {
            return Err(invalid(format!(
                "{label}: apex {} must lie strictly between brake {} and exit {}",
                self.apex_distance, self.brake_distance, self.exit_distance
            )));
        }
        if self.brake_distance < 0.0 || self.exit_distance > track_length {
            return Err(invalid(format!(
                "{label}: spans [{}, {}] outside the line [0, {track_length}]",
                self.brake_distance, self.exit_distance
            )));
        }
        if self.apex_speed <= 0.0 || self.exit_speed <= 0.0 {
            return Err(invalid(format!("{label}: target speeds must be positive")));
        }
        Ok(())
    }

    #[must_use]
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("T{}", self.number)
        } else {
            self.name.clone()
        }
    }
}

/// A turn seen from a position on the line.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TurnAhead<'a> {
    pub turn: &'a Turn,
    /// Negative once the brake point has been passed.
    pub distance_to_brake: f32,
    pub distance_to_apex: f32,
    pub distance_to_exit: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(brake: f32, apex: f32, exit: f32) -> Turn {
        Turn {
            number: 1,
            name: String::new(),
            brake_distance: brake,
            apex_distance: apex,
            apex_speed: 90.0,
            exit_distance: exit,
            exit_speed: 140.0,
            direction: TurnDirection::Left,
        }
    }

    #[test]
    fn ordered_turn_is_valid() {
        assert!(turn(100.0, 150.0, 200.0).validate(1_000.0).is_ok());
    }

    #[test]
    fn apex_on_brake_point_is_rejected() {
        let err = turn(150.0, 150.0, 200.0).validate(1_000.0).unwrap_err();
        assert!(matches!(err, TrackError::InvalidTrackData(msg) if msg.starts_with("T1")));
    }

    #[test]
    fn turn_past_the_end_is_rejected() {
        assert!(turn(900.0, 950.0, 1_050.0).validate(1_000.0).is_err());
    }
}
