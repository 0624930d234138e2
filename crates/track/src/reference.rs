//! Built-in 19-turn circuit.
//!
//! The layout is a sequence of straights and constant-radius arcs. Turn
//! directions alternate and the running heading stays within ±75° of the
//! x axis, so the ribbon never crosses itself. Brake points are placed where
//! the reference speed profile starts to fall into each arc.

use crate::error::TrackError;
use crate::geometry::{PointDescription, TrackDescription, TrackGeometry};
use crate::turn::{Turn, TurnDirection};
use physics::Vec2;

const SPACING: f32 = 2.0;
const FINAL_STRAIGHT: f32 = 250.0;
/// Samples past the arc end that mark the turn exit.
const EXIT_SAMPLES: usize = 10;

struct Corner {
    straight: f32,
    radius: f32,
    /// Degrees, positive to the left.
    angle: f32,
}

const fn corner(straight: f32, radius: f32, angle: f32) -> Corner {
    Corner { straight, radius, angle }
}

const LAYOUT: [Corner; 19] = [
    corner(300.0, 60.0, 60.0),
    corner(150.0, 35.0, -100.0),
    corner(200.0, 80.0, 80.0),
    corner(120.0, 120.0, -60.0),
    corner(250.0, 45.0, 45.0),
    corner(100.0, 30.0, -70.0),
    corner(400.0, 25.0, 90.0),
    corner(180.0, 70.0, -85.0),
    corner(90.0, 150.0, 30.0),
    corner(220.0, 100.0, -40.0),
    corner(160.0, 40.0, 75.0),
    corner(300.0, 28.0, -80.0),
    corner(140.0, 90.0, 50.0),
    corner(110.0, 55.0, -55.0),
    corner(350.0, 65.0, 65.0),
    corner(130.0, 35.0, -70.0),
    corner(200.0, 110.0, 35.0),
    corner(150.0, 75.0, -45.0),
    corner(120.0, 50.0, 30.0),
];

/// Point indices of each arc.
struct Arc {
    start: usize,
    end: usize,
    direction: TurnDirection,
}

fn straight(pos: &mut Vec2, heading: f32, points: &mut Vec<PointDescription>, length: f32) {
    let steps = (length / SPACING).round().max(1.0) as usize;
    let step = length / steps as f32;
    for _ in 0..steps {
        *pos += Vec2::from_angle(heading) * step;
        points.push(PointDescription::new(pos.x, pos.y));
    }
}

fn build() -> (TrackDescription, Vec<Arc>) {
    let mut pos = Vec2::ZERO;
    let mut heading = 0.0_f32;
    let mut points = vec![PointDescription::new(pos.x, pos.y)];
    let mut arcs = Vec::with_capacity(LAYOUT.len());

    for c in &LAYOUT {
        straight(&mut pos, heading, &mut points, c.straight);
        let sweep = c.angle.to_radians();
        let steps = (c.radius * sweep.abs() / SPACING).ceil().max(2.0) as usize;
        let dtheta = sweep / steps as f32;
        let chord = 2.0 * c.radius * (0.5 * dtheta.abs()).sin();
        let start = points.len() - 1;
        for _ in 0..steps {
            heading += 0.5 * dtheta;
            pos += Vec2::from_angle(heading) * chord;
            heading += 0.5 * dtheta;
            points.push(PointDescription::new(pos.x, pos.y));
        }
        arcs.push(Arc {
            start,
            end: points.len() - 1,
            direction: if c.angle > 0.0 { TurnDirection::Left } else { TurnDirection::Right },
        });
    }
    straight(&mut pos, heading, &mut points, FINAL_STRAIGHT);

    let desc = TrackDescription {
        name: "Reference Circuit".to_string(),
        points,
        turns: Vec::new(),
        closed: Some(false),
    };
    (desc, arcs)
}

/// Centreline of the reference circuit without its turn registry.
#[must_use]
pub fn reference_description() -> TrackDescription {
    build().0
}

/// The reference circuit with its 19 turns registered.
///
/// # Errors
///
/// Only if the built-in layout fails validation.
pub fn reference_circuit() -> Result<TrackGeometry, TrackError> {
    let (desc, arcs) = build();
    let geometry = TrackGeometry::from_description(&desc)?;
    let points = geometry.points();
    let last = points.len() - 1;

    let turns = arcs
        .iter()
        .zip(1_u32..)
        .map(|(arc, number)| {
            let apex = (arc.start + arc.end) / 2;
            let exit = (arc.end + EXIT_SAMPLES).min(last);

            let mut brake = arc.start;
            while brake > 0 && points[brake - 1].reference_speed > points[brake].reference_speed + 1e-3 {
                brake -= 1;
            }
            if brake >= arc.start {
                brake = arc.start.saturating_sub(5);
            }

            Turn {
                number,
                name: format!("Turn {number}"),
                brake_distance: points[brake].distance,
                apex_distance: points[apex].distance,
                apex_speed: points[apex].reference_speed * 3.6,
                exit_distance: points[exit].distance,
                exit_speed: points[exit].reference_speed * 3.6,
                direction: arc.direction,
            }
        })
        .collect();
    geometry.with_turns(turns)
}
