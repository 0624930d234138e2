use crate::error::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::str::FromStr;

/// Corner indices into the per-tire arrays of [`CarState`].
pub const FL: usize = 0;
pub const FR: usize = 1;
pub const RL: usize = 2;
pub const RR: usize = 3;
pub const CORNERS: usize = 4;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `theta` radians from the +x axis.
    #[must_use]
    pub fn from_angle(theta: f32) -> Self {
        Self::new(theta.cos(), theta.sin())
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3-D cross product; positive when `other` lies to the left.
    #[must_use]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    #[must_use]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Left-hand perpendicular.
    #[must_use]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
}

impl TireCompound {
    pub const ALL: [Self; 3] = [Self::Soft, Self::Medium, Self::Hard];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Soft => "SOFT",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for TireCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TireCompound {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SOFT" | "S" => Ok(Self::Soft),
            "MEDIUM" | "M" => Ok(Self::Medium),
            "HARD" | "H" => Ok(Self::Hard),
            _ => Err(ParseEnumError { kind: "tire compound", value: s.to_string() }),
        }
    }
}

/// Track surface condition. Scales available grip and ambient tire temperature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Dry,
    Damp,
    Wet,
}

impl Weather {
    pub const ALL: [Self; 3] = [Self::Dry, Self::Damp, Self::Wet];

    #[must_use]
    pub const fn grip_factor(self) -> f32 {
        match self {
            Self::Dry => 1.0,
            Self::Damp => 0.85,
            Self::Wet => 0.70,
        }
    }

    /// Ambient temperature the tires cool towards, in °C.
    #[must_use]
    pub const fn ambient_temp(self) -> f32 {
        match self {
            Self::Dry => 30.0,
            Self::Damp => 22.0,
            Self::Wet => 18.0,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Damp => "damp",
            Self::Wet => "wet",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weather {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dry" => Ok(Self::Dry),
            "damp" | "intermediate" => Ok(Self::Damp),
            "wet" => Ok(Self::Wet),
            _ => Err(ParseEnumError { kind: "weather class", value: s.to_string() }),
        }
    }
}

/// Driver input for one step.
///
/// `throttle` and `brake` are percentages in `[0, 100]`, `steering` is in
/// `[-1, 1]` with positive values turning left.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub throttle: f32,
    pub brake: f32,
    pub steering: f32,
}

impl Action {
    pub const COAST: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(throttle: f32, brake: f32, steering: f32) -> Self {
        Self { throttle, brake, steering }
    }

    #[must_use]
    pub const fn full_throttle() -> Self {
        Self::new(100.0, 0.0, 0.0)
    }

    /// Clamp every channel into its valid range. Non-finite inputs become zero.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let sanitize = |v: f32, lo: f32, hi: f32| if v.is_finite() { v.clamp(lo, hi) } else { 0.0 };
        Self {
            throttle: sanitize(self.throttle, 0.0, 100.0),
            brake: sanitize(self.brake, 0.0, 100.0),
            steering: sanitize(self.steering, -1.0, 1.0),
        }
    }

    /// Map a network output in `[-1, 1]^3` onto the action ranges.
    #[must_use]
    pub fn from_normalized(v: [f32; 3]) -> Self {
        let unit = |x: f32| x.clamp(-1.0, 1.0);
        Self {
            throttle: (unit(v[0]) + 1.0) * 50.0,
            brake: (unit(v[1]) + 1.0) * 50.0,
            steering: unit(v[2]),
        }
        .clamped()
    }

    #[must_use]
    pub fn to_normalized(&self) -> [f32; 3] {
        let a = self.clamped();
        [a.throttle / 50.0 - 1.0, a.brake / 50.0 - 1.0, a.steering]
    }

    /// Size of the input change between two consecutive actions, each
    /// channel scaled to a unit range.
    #[must_use]
    pub fn change_from(&self, previous: &Self) -> f32 {
        (self.throttle - previous.throttle).abs() / 100.0
            + (self.brake - previous.brake).abs() / 100.0
            + (self.steering - previous.steering).abs() / 2.0
    }
}

/// Complete dynamic state of the car.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub position: Vec2,
    /// Radians in `[-π, π)`.
    pub heading: f32,
    /// m/s, never negative.
    pub speed: f32,
    /// m/s², positive when accelerating.
    pub long_accel: f32,
    /// m/s², positive when turning left.
    pub lat_accel: f32,
    pub tire_wear: [f32; CORNERS],
    /// °C
    pub tire_temp: [f32; CORNERS],
    pub gear: u8,
    pub rpm: f32,
    pub compound: TireCompound,
    pub fuel_kg: f32,
    /// Odometer in meters.
    pub odometer: f32,
    /// Seconds since the state was created.
    pub elapsed: f32,
}

impl CarState {
    pub const START_TIRE_TEMP: f32 = 80.0;
    pub const START_FUEL_KG: f32 = 100.0;

    #[must_use]
    pub fn new(position: Vec2, heading: f32, speed: f32, compound: TireCompound) -> Self {
        Self {
            position,
            heading,
            speed: speed.max(0.0),
            long_accel: 0.0,
            lat_accel: 0.0,
            tire_wear: [0.0; CORNERS],
            tire_temp: [Self::START_TIRE_TEMP; CORNERS],
            gear: 1,
            rpm: 5000.0,
            compound,
            fuel_kg: Self::START_FUEL_KG,
            odometer: 0.0,
            elapsed: 0.0,
        }
    }

    #[must_use]
    pub fn with_wear(mut self, wear: f32) -> Self {
        self.tire_wear = [wear.clamp(0.0, 1.0); CORNERS];
        self
    }

    #[must_use]
    pub fn mean_wear(&self) -> f32 {
        self.tire_wear.iter().sum::<f32>() / CORNERS as f32
    }

    #[must_use]
    pub fn max_wear(&self) -> f32 {
        self.tire_wear.iter().copied().fold(0.0, f32::max)
    }

    #[must_use]
    pub fn mean_temp(&self) -> f32 {
        self.tire_temp.iter().sum::<f32>() / CORNERS as f32
    }

    #[must_use]
    pub fn speed_kmh(&self) -> f32 {
        self.speed * 3.6
    }

    /// Name of the first non-finite quantity, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<&'static str> {
        if !self.position.is_finite() {
            Some("position")
        } else if !self.heading.is_finite() {
            Some("heading")
        } else if !self.speed.is_finite() {
            Some("speed")
        } else if !self.long_accel.is_finite() {
            Some("long_accel")
        } else if !self.lat_accel.is_finite() {
            Some("lat_accel")
        } else if !self.tire_wear.iter().all(|w| w.is_finite()) {
            Some("tire_wear")
        } else if !self.tire_temp.iter().all(|t| t.is_finite()) {
            Some("tire_temp")
        } else if !self.rpm.is_finite() {
            Some("rpm")
        } else if !self.fuel_kg.is_finite() {
            Some("fuel_kg")
        } else {
            None
        }
    }
}
