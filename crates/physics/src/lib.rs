#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
//! # Racelab Physics Engine
//!
//! A deterministic, fixed-step model of a single open-wheel race car.
//!
//! The engine advances a [`CarState`] by one timestep under an [`Action`]
//! (throttle, brake, steering). Each step computes:
//!
//! -   **Longitudinal forces:** engine drive derived from a power curve and an
//!     automatic gearbox, braking, aerodynamic drag and rolling resistance.
//! -   **Friction circle:** combined longitudinal and lateral tire force is
//!     bounded by `μ · vertical_load`. Demands that exceed the bound are
//!     clamped and the clamp is reported in the [`StepReport`].
//! -   **Tires:** per-corner wear (monotonic within a stint) and temperature
//!     (first-order lag towards a load-dependent equilibrium). Grip depends on
//!     compound, wear and temperature, peaking inside the compound's
//!     operating window.
//! -   **Weight transfer:** longitudinal acceleration shifts load between the
//!     axles, which shifts the effective grip towards the loaded axle's tires.
//!
//! Integration is semi-implicit Euler with no adaptive stepping, so identical
//! inputs always produce identical outputs. A step that produces a non-finite
//! quantity fails with [`PhysicsError::SimulationDivergence`].
//!
//! ```rust
//! use physics::{Action, CarDynamics, CarState, TireCompound, Vec2, Weather};
//!
//! let dynamics = CarDynamics::new(Default::default(), Weather::Dry);
//! let mut state = CarState::new(Vec2::ZERO, 0.0, 8.3, TireCompound::Soft);
//! for _ in 0..100 {
//!     state = dynamics.step(&state, &Action::full_throttle(), 0.01)?.state;
//! }
//! assert!(state.speed > 8.3);
//! # Ok::<(), physics::PhysicsError>(())
//! ```

pub mod error;
pub mod integrator;
pub mod params;
pub mod tire;
pub mod types;

pub use error::{ParseEnumError, PhysicsError};
pub use integrator::{friction_circle, wrap_angle, CarDynamics, ForceReport, ForceSplit, StepReport};
pub use params::{CarParams, CompoundSpec, TireParams};
pub use types::{Action, CarState, TireCompound, Vec2, Weather, CORNERS, FL, FR, RL, RR};
