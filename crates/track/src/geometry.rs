//! Centreline geometry and the queries the environment runs against it.

use crate::error::{invalid, TrackError};
use crate::grid::SegmentGrid;
use crate::turn::{Turn, TurnAhead};
use physics::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Half width used when a description omits boundary offsets, in meters.
pub const DEFAULT_HALF_WIDTH: f32 = 7.5;
/// Lookahead window in meters.
pub const DEFAULT_HORIZON: f32 = 200.0;
/// Values emitted per turn slot by [`TrackGeometry::lookahead_features`].
pub const FEATURES_PER_TURN: usize = 3;

const GRID_CELL: f32 = 25.0;

// Envelope of the reference speed profile.
const PROFILE_LATERAL_ACCEL: f32 = 25.0;
const PROFILE_ACCEL: f32 = 9.0;
const PROFILE_BRAKE: f32 = 30.0;
const PROFILE_MAX_SPEED: f32 = 90.0;

fn default_half_width() -> f32 {
    DEFAULT_HALF_WIDTH
}

/// One centreline point as written in a track file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointDescription {
    pub x: f32,
    pub y: f32,
    /// Distance along the line. Computed from the positions when any point
    /// leaves it out.
    #[serde(default)]
    pub distance: Option<f32>,
    #[serde(default = "default_half_width")]
    pub left_width: f32,
    #[serde(default = "default_half_width")]
    pub right_width: f32,
    /// Reference speed in km/h. Derived from curvature when absent.
    #[serde(default)]
    pub speed: Option<f32>,
}

impl PointDescription {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            distance: None,
            left_width: DEFAULT_HALF_WIDTH,
            right_width: DEFAULT_HALF_WIDTH,
            speed: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackDescription {
    pub name: String,
    pub points: Vec<PointDescription>,
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Whether the last point connects back to the first. Inferred from the
    /// gap between them when absent.
    #[serde(default)]
    pub closed: Option<bool>,
}

impl TrackDescription {
    /// # Errors
    ///
    /// [`TrackError::Json`] when `json` does not describe a track.
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// I/O or JSON failure.
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: Vec2,
    pub distance: f32,
    pub left_width: f32,
    pub right_width: f32,
    /// Signed, 1/m, positive for a left-hand bend.
    pub curvature: f32,
    /// m/s
    pub reference_speed: f32,
    /// Seconds from the start of the line at the reference speed.
    pub reference_time: f32,
}

/// Result of projecting a position onto the line.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    pub distance: f32,
    /// Positive to the left of the direction of travel.
    pub lateral_offset: f32,
    pub curvature: f32,
    /// Tangent direction at the projected point, radians.
    pub heading: f32,
    pub segment: usize,
}

/// A point on the line at a given distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinePoint {
    pub position: Vec2,
    pub heading: f32,
    pub curvature: f32,
    pub reference_speed: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub fn of_offset(lateral_offset: f32) -> Self {
        if lateral_offset >= 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackGeometry {
    name: String,
    points: Vec<TrackPoint>,
    turns: Vec<Turn>,
    length: f32,
    lap_time: f32,
    closed: bool,
    min: Vec2,
    max: Vec2,
    grid: SegmentGrid,
}

impl TrackGeometry {
    /// Validate a description and build the geometry.
    ///
    /// # Errors
    ///
    /// [`TrackError::InvalidTrackData`] when there are fewer than three
    /// points, a coordinate or width is not finite or not positive, two
    /// consecutive points coincide, distances do not increase, or a turn
    /// fails [`Turn::validate`].
    pub fn from_description(desc: &TrackDescription) -> Result<Self, TrackError> {
        let mut raw = desc.points.clone();
        if raw.len() < 3 {
            return Err(invalid(format!("{} points; at least 3 are required", raw.len())));
        }
        for (i, p) in raw.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(invalid(format!("point {i}: non-finite coordinate")));
            }
            if !(p.left_width.is_finite() && p.right_width.is_finite())
                || p.left_width <= 0.0
                || p.right_width <= 0.0
            {
                return Err(invalid(format!("point {i}: boundary offsets must be positive")));
            }
            if let Some(speed) = p.speed {
                if !speed.is_finite() || speed <= 0.0 {
                    return Err(invalid(format!("point {i}: reference speed must be positive")));
                }
            }
        }

        let pos = |p: &PointDescription| Vec2::new(p.x, p.y);
        let mut closed = desc.closed;
        // A repeated start point closes the loop; it is not a segment.
        while raw.len() > 1 && pos(&raw[0]).distance(pos(&raw[raw.len() - 1])) < 1e-3 {
            raw.pop();
            closed = Some(true);
        }
        if raw.len() < 3 {
            return Err(invalid(format!("{} distinct points around the loop; at least 3 are required", raw.len())));
        }

        let mut distances = Vec::with_capacity(raw.len());
        let mut total = 0.0_f32;
        for (i, p) in raw.iter().enumerate() {
            if i > 0 {
                let gap = pos(p).distance(pos(&raw[i - 1]));
                if gap < 1e-4 {
                    return Err(invalid(format!("points {} and {i} coincide", i - 1)));
                }
                total += gap;
            }
            distances.push(total);
        }
        if raw.iter().all(|p| p.distance.is_some()) {
            let given: Vec<f32> = raw.iter().filter_map(|p| p.distance).collect();
            if given.iter().any(|d| !d.is_finite()) || given.windows(2).any(|w| w[1] <= w[0]) {
                return Err(invalid("distances must be finite and strictly increasing"));
            }
            let start = given[0];
            distances = given.iter().map(|d| d - start).collect();
        }

        let n = raw.len();
        let closing_gap = pos(&raw[0]).distance(pos(&raw[n - 1]));
        let mean_gap = distances[n - 1] / (n - 1) as f32;
        let closed = closed.unwrap_or(closing_gap <= 1.5 * mean_gap);
        let length = if closed { distances[n - 1] + closing_gap } else { distances[n - 1] };

        let mut points: Vec<TrackPoint> = raw
            .iter()
            .zip(&distances)
            .map(|(p, &distance)| TrackPoint {
                position: pos(p),
                distance,
                left_width: p.left_width,
                right_width: p.right_width,
                curvature: 0.0,
                reference_speed: p.speed.map_or(0.0, |kmh| kmh / 3.6),
                reference_time: 0.0,
            })
            .collect();

        let curvature: Vec<f32> = (0..n).map(|i| menger_curvature(&points, i, closed)).collect();
        for (p, k) in points.iter_mut().zip(curvature) {
            p.curvature = k;
        }
        if !closed {
            points[0].curvature = points[1].curvature;
            points[n - 1].curvature = points[n - 2].curvature;
        }
        if raw.iter().any(|p| p.speed.is_none()) {
            let profile = speed_profile(&points, length, closed);
            for (p, (v, d)) in points.iter_mut().zip(profile.into_iter().zip(&raw)) {
                if d.speed.is_none() {
                    p.reference_speed = v;
                }
            }
        }
        let lap_time = accumulate_times(&mut points, length, closed);

        let (mut min, mut max) = (points[0].position, points[0].position);
        for p in &points {
            let margin = p.left_width.max(p.right_width);
            min = Vec2::new(min.x.min(p.position.x - margin), min.y.min(p.position.y - margin));
            max = Vec2::new(max.x.max(p.position.x + margin), max.y.max(p.position.y + margin));
        }
        let segments = segment_list(&points, closed);
        let grid = SegmentGrid::build(&segments, min, max, GRID_CELL);

        let geometry = Self {
            name: desc.name.clone(),
            points,
            turns: Vec::new(),
            length,
            lap_time,
            closed,
            min,
            max,
            grid,
        };
        let geometry = geometry.with_turns(desc.turns.clone())?;
        debug!(
            track = %geometry.name,
            points = geometry.points.len(),
            turns = geometry.turns.len(),
            length = geometry.length,
            closed,
            "track loaded"
        );
        Ok(geometry)
    }

    /// Replace the turn registry after validating every entry.
    ///
    /// # Errors
    ///
    /// The first turn that fails [`Turn::validate`].
    pub fn with_turns(mut self, mut turns: Vec<Turn>) -> Result<Self, TrackError> {
        for turn in &turns {
            turn.validate(self.length)?;
        }
        turns.sort_by(|a, b| a.apex_distance.total_cmp(&b.apex_distance).then(a.number.cmp(&b.number)));
        self.turns = turns;
        Ok(self)
    }

    /// # Errors
    ///
    /// As [`TrackDescription::load`] and [`TrackGeometry::from_description`].
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        Self::from_description(&TrackDescription::load(path)?)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Turns ordered by apex distance.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Time to cover the whole line at the reference speed.
    #[must_use]
    pub fn reference_lap_time(&self) -> f32 {
        self.lap_time
    }

    /// Coordinate extent of the boundaries.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    /// Whether `p` lies within the coordinate extent grown by `margin`.
    #[must_use]
    pub fn within_bounds(&self, p: Vec2, margin: f32) -> bool {
        p.is_finite()
            && p.x >= self.min.x - margin
            && p.x <= self.max.x + margin
            && p.y >= self.min.y - margin
            && p.y <= self.max.y + margin
    }

    fn segment_count(&self) -> usize {
        if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    fn segment(&self, i: usize) -> (&TrackPoint, &TrackPoint, f32) {
        let a = &self.points[i];
        let next = (i + 1) % self.points.len();
        let end = if next == 0 { self.length } else { self.points[next].distance };
        (a, &self.points[next], end)
    }

    fn project_onto(&self, i: usize, p: Vec2) -> (f32, f32, Vec2) {
        let (a, b, _) = self.segment(i);
        let ab = b.position - a.position;
        let t = ((p - a.position).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
        let foot = a.position + ab * t;
        (p.distance(foot), t, foot)
    }

    /// Nearest point on the line to `position`.
    ///
    /// Ties between equally distant segments resolve to the lowest segment
    /// index, so the result depends only on `position`.
    #[must_use]
    pub fn project(&self, position: Vec2) -> Projection {
        let found = self.grid.nearest(position, |i| self.project_onto(i, position).0);
        match found {
            Some((segment, _)) => self.projection_on(segment, position),
            None => self.project_exhaustive(position),
        }
    }

    /// [`project`](Self::project) without the spatial grid.
    #[must_use]
    pub fn project_exhaustive(&self, position: Vec2) -> Projection {
        let mut best = (0, f32::INFINITY);
        for i in 0..self.segment_count() {
            let d = self.project_onto(i, position).0;
            if d < best.1 {
                best = (i, d);
            }
        }
        self.projection_on(best.0, position)
    }

    fn projection_on(&self, segment: usize, position: Vec2) -> Projection {
        let (a, b, end) = self.segment(segment);
        let (_, t, foot) = self.project_onto(segment, position);
        let tangent = (b.position - a.position).normalize_or_zero();
        let mut distance = a.distance + t * (end - a.distance);
        if self.closed && distance >= self.length {
            distance -= self.length;
        }
        Projection {
            distance,
            lateral_offset: tangent.cross(position - foot),
            curvature: a.curvature + t * (b.curvature - a.curvature),
            heading: tangent.angle(),
            segment,
        }
    }

    /// Wrap (closed) or clamp (open) a distance onto the line.
    #[must_use]
    pub fn normalize_distance(&self, distance: f32) -> f32 {
        if self.closed {
            distance.rem_euclid(self.length)
        } else {
            distance.clamp(0.0, self.length)
        }
    }

    /// Segment containing `distance` and the fraction along it.
    fn locate(&self, distance: f32) -> (usize, f32) {
        let d = self.normalize_distance(distance);
        let i = self.points.partition_point(|p| p.distance <= d).saturating_sub(1);
        let i = i.min(self.segment_count() - 1);
        let (a, _, end) = self.segment(i);
        let span = end - a.distance;
        let t = if span > 0.0 { ((d - a.distance) / span).clamp(0.0, 1.0) } else { 0.0 };
        (i, t)
    }

    #[must_use]
    pub fn point_at(&self, distance: f32) -> LinePoint {
        let (i, t) = self.locate(distance);
        let (a, b, _) = self.segment(i);
        let ab = b.position - a.position;
        LinePoint {
            position: a.position + ab * t,
            heading: ab.angle(),
            curvature: a.curvature + t * (b.curvature - a.curvature),
            reference_speed: a.reference_speed + t * (b.reference_speed - a.reference_speed),
        }
    }

    #[must_use]
    pub fn curvature_at(&self, distance: f32) -> f32 {
        self.point_at(distance).curvature
    }

    /// Boundary offset on one side of the line at `distance`.
    #[must_use]
    pub fn half_width(&self, distance: f32, side: Side) -> f32 {
        let (i, t) = self.locate(distance);
        let (a, b, _) = self.segment(i);
        match side {
            Side::Left => a.left_width + t * (b.left_width - a.left_width),
            Side::Right => a.right_width + t * (b.right_width - a.right_width),
        }
    }

    /// Half width on the side the offset points to.
    #[must_use]
    pub fn boundary_half_width(&self, distance: f32, lateral_offset: f32) -> f32 {
        self.half_width(distance, Side::of_offset(lateral_offset))
    }

    #[must_use]
    pub fn is_off_track(&self, projection: &Projection) -> bool {
        projection.lateral_offset.abs()
            > self.boundary_half_width(projection.distance, projection.lateral_offset)
    }

    fn time_at(&self, distance: f32) -> f32 {
        let (i, t) = self.locate(distance);
        let (a, b, _) = self.segment(i);
        let next_time = if b.distance <= a.distance { self.lap_time } else { b.reference_time };
        a.reference_time + t * (next_time - a.reference_time)
    }

    /// Time at the reference speed to drive from `from` to `to`.
    ///
    /// On a closed line the interval wraps past the start. On an open line
    /// the result is negative when `to` lies behind `from`.
    #[must_use]
    pub fn reference_time(&self, from: f32, to: f32) -> f32 {
        let dt = self.time_at(to) - self.time_at(from);
        if self.closed && dt < 0.0 {
            dt + self.lap_time
        } else {
            dt
        }
    }

    /// Turns whose apex lies within `(distance, distance + horizon]`, nearest
    /// first.
    #[must_use]
    pub fn lookahead(&self, distance: f32, horizon: f32) -> Vec<TurnAhead<'_>> {
        let d = self.normalize_distance(distance);
        let mut ahead: Vec<TurnAhead<'_>> = self
            .turns
            .iter()
            .filter_map(|turn| {
                let mut to_apex = turn.apex_distance - d;
                if self.closed && to_apex <= 0.0 {
                    to_apex += self.length;
                }
                (to_apex > 0.0 && to_apex <= horizon).then(|| TurnAhead {
                    turn,
                    distance_to_brake: to_apex - (turn.apex_distance - turn.brake_distance),
                    distance_to_apex: to_apex,
                    distance_to_exit: to_apex + (turn.exit_distance - turn.apex_distance),
                })
            })
            .collect();
        ahead.sort_by(|a, b| {
            a.distance_to_apex.total_cmp(&b.distance_to_apex).then(a.turn.number.cmp(&b.turn.number))
        });
        ahead
    }

    /// Fixed-length encoding of [`lookahead`](Self::lookahead): `slots` turns
    /// of [`FEATURES_PER_TURN`] values each, nearest first.
    ///
    /// A slot holds the apex distance as a fraction of the horizon, the apex
    /// target speed over 360 km/h and the signed apex curvature scaled into
    /// `[-1, 1]`. Missing turns are padded with `[1, 1, 0]`, extra turns are
    /// dropped.
    #[must_use]
    pub fn lookahead_features(&self, distance: f32, horizon: f32, slots: usize) -> Vec<f32> {
        let mut features = Vec::with_capacity(slots * FEATURES_PER_TURN);
        for ahead in self.lookahead(distance, horizon).into_iter().take(slots) {
            let curvature = self.curvature_at(ahead.turn.apex_distance);
            features.push((ahead.distance_to_apex / horizon).clamp(0.0, 1.0));
            features.push((ahead.turn.apex_speed / 360.0).clamp(0.0, 1.0));
            features.push((curvature * 20.0).clamp(-1.0, 1.0));
        }
        while features.len() < slots * FEATURES_PER_TURN {
            features.extend_from_slice(&[1.0, 1.0, 0.0]);
        }
        features
    }

    /// The next turn whose apex lies ahead of `distance`, wrapping on a
    /// closed line.
    #[must_use]
    pub fn next_turn(&self, distance: f32) -> Option<TurnAhead<'_>> {
        self.lookahead(distance, self.length).into_iter().next()
    }
}

fn segment_list(points: &[TrackPoint], closed: bool) -> Vec<(Vec2, Vec2)> {
    let n = points.len();
    let count = if closed { n } else { n - 1 };
    (0..count).map(|i| (points[i].position, points[(i + 1) % n].position)).collect()
}

/// Signed curvature of the circle through three consecutive points.
fn menger_curvature(points: &[TrackPoint], i: usize, closed: bool) -> f32 {
    let n = points.len();
    let (prev, next) = if closed {
        ((i + n - 1) % n, (i + 1) % n)
    } else if i == 0 || i == n - 1 {
        return 0.0;
    } else {
        (i - 1, i + 1)
    };
    let (a, b, c) = (points[prev].position, points[i].position, points[next].position);
    let denom = (b - a).length() * (c - b).length() * (c - a).length();
    if denom <= f32::EPSILON {
        0.0
    } else {
        2.0 * (b - a).cross(c - b) / denom
    }
}

fn gap_before(points: &[TrackPoint], length: f32, i: usize) -> f32 {
    if i == 0 {
        length - points[points.len() - 1].distance
    } else {
        points[i].distance - points[i - 1].distance
    }
}

/// Corner-limited speed with acceleration and braking envelopes applied.
fn speed_profile(points: &[TrackPoint], length: f32, closed: bool) -> Vec<f32> {
    let n = points.len();
    let mut v: Vec<f32> = points
        .iter()
        .map(|p| {
            let k = p.curvature.abs();
            if k > 1e-6 {
                (PROFILE_LATERAL_ACCEL / k).sqrt().min(PROFILE_MAX_SPEED)
            } else {
                PROFILE_MAX_SPEED
            }
        })
        .collect();

    // a closed line needs a second lap for the envelopes to settle across the start
    let passes = if closed { 2 * n } else { n };
    for k in 1..passes {
        let i = k % n;
        let prev = (k - 1) % n;
        let ds = gap_before(points, length, i);
        v[i] = v[i].min((v[prev] * v[prev] + 2.0 * PROFILE_ACCEL * ds).sqrt());
    }
    for k in (0..passes - 1).rev() {
        let i = k % n;
        let next = (k + 1) % n;
        let ds = gap_before(points, length, next);
        v[i] = v[i].min((v[next] * v[next] + 2.0 * PROFILE_BRAKE * ds).sqrt());
    }
    v
}

/// Fill `reference_time` and return the time for the full line.
fn accumulate_times(points: &mut [TrackPoint], length: f32, closed: bool) -> f32 {
    let mean_speed = |a: f32, b: f32| (0.5 * (a + b)).max(1.0);
    let mut t = 0.0;
    points[0].reference_time = 0.0;
    for i in 1..points.len() {
        let ds = points[i].distance - points[i - 1].distance;
        t += ds / mean_speed(points[i - 1].reference_speed, points[i].reference_speed);
        points[i].reference_time = t;
    }
    if closed {
        let last = points.len() - 1;
        let ds = gap_before(points, length, 0);
        t += ds / mean_speed(points[last].reference_speed, points[0].reference_speed);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f32, step: f32) -> TrackDescription {
        let mut points = Vec::new();
        let per_side = (side / step) as usize;
        let corners = [(0.0, 0.0, 1.0, 0.0), (side, 0.0, 0.0, 1.0), (side, side, -1.0, 0.0), (0.0, side, 0.0, -1.0)];
        for (x0, y0, dx, dy) in corners {
            for k in 0..per_side {
                let s = k as f32 * step;
                points.push(PointDescription::new(x0 + dx * s, y0 + dy * s));
            }
        }
        TrackDescription { name: "square".into(), points, turns: Vec::new(), closed: None }
    }

    #[test]
    fn square_is_detected_as_closed() {
        let track = TrackGeometry::from_description(&square(100.0, 5.0)).unwrap();
        assert!(track.is_closed());
        assert!((track.length() - 400.0).abs() < 1e-2);
    }

    #[test]
    fn closed_distances_wrap() {
        let track = TrackGeometry::from_description(&square(100.0, 5.0)).unwrap();
        let a = track.point_at(10.0).position;
        let b = track.point_at(410.0).position;
        assert!(a.distance(b) < 1e-3);
        let proj = track.project(Vec2::new(-1.0, 0.5));
        assert!(proj.distance < 1.0 || proj.distance > 399.0);
    }

    #[test]
    fn square_corners_curve_left() {
        let track = TrackGeometry::from_description(&square(100.0, 5.0)).unwrap();
        assert!(track.curvature_at(100.0) > 0.0);
        assert!(track.curvature_at(50.0).abs() < 1e-6);
    }

    #[test]
    fn profile_slows_for_corners() {
        let track = TrackGeometry::from_description(&square(100.0, 5.0)).unwrap();
        let corner = track.point_at(100.0).reference_speed;
        let straight = track.point_at(50.0).reference_speed;
        assert!(corner < straight);
        assert!(track.reference_lap_time() > 0.0);
    }

    #[test]
    fn wrapped_reference_time_is_positive() {
        let track = TrackGeometry::from_description(&square(100.0, 5.0)).unwrap();
        let forward = track.reference_time(390.0, 10.0);
        assert!(forward > 0.0);
        assert!(forward < track.reference_lap_time() / 2.0);
    }
}
