#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
//! # Track Model
//!
//! Racing-line geometry built once from an ordered centreline description and
//! shared read-only afterwards. The model answers three questions for the
//! environment and the scenario compiler:
//!
//! * where a position sits relative to the line ([`TrackGeometry::project`]),
//! * whether it is still inside the boundaries ([`TrackGeometry::is_off_track`]),
//! * which turns come next ([`TrackGeometry::lookahead`]).
//!
//! ```
//! use track::reference_circuit;
//!
//! let track = reference_circuit().unwrap();
//! let p = track.point_at(120.0);
//! let proj = track.project(p.position);
//! assert!((proj.distance - 120.0).abs() < 0.1);
//! assert!(proj.lateral_offset.abs() < 1e-3);
//! ```

pub mod error;
pub mod geometry;
mod grid;
pub mod reference;
pub mod telemetry;
pub mod turn;

pub use error::TrackError;
pub use geometry::{
    LinePoint, PointDescription, Projection, Side, TrackDescription, TrackGeometry, TrackPoint,
    DEFAULT_HALF_WIDTH, DEFAULT_HORIZON, FEATURES_PER_TURN,
};
pub use reference::{reference_circuit, reference_description};
pub use telemetry::{description_from_telemetry, detect_turns, TelemetrySample};
pub use turn::{Turn, TurnAhead, TurnDirection};
