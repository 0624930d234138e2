//! # Racelab
//!
//! Documentation entry point and command-line driver for the racing
//! pipeline: a vehicle model, a racing-line track model, an episodic
//! environment with a PPO trainer, and an offline scenario compiler whose
//! output answers live "what should the car do here" queries within a
//! fixed latency budget.
//!
//! ## The Crates
//!
//! -   **`racelab`:** The crate you are viewing. It loads configuration,
//!     wires the stages together and runs them as subcommands. While
//!     serving, it watches the scenario database and hot-swaps rewrites.
//! -   **[`physics`]:** Semi-implicit Euler car dynamics: engine and brake
//!     forces, aerodynamic drag and downforce, a friction circle per corner,
//!     tyre wear by compound and weather.
//! -   **[`track`]:** Racing-line geometry built from a JSON description or
//!     reference telemetry: projection, boundaries, turn lookahead and a
//!     reference speed profile.
//! -   **[`ml`]:** Dense layers, the Gaussian policy head and the Adam
//!     optimizer the trainer is built on.
//! -   **[`rl`]:** The racing environment, rollouts, PPO updates,
//!     checkpoints, lap evaluation and telemetry validation, plus the pit
//!     strategy built on the tyre wear model and race classification.
//! -   **[`scenario`]:** The scenario grid, the parallel compiler, the
//!     checksummed database file and the bounded-latency lookup service.
//!
//! ## Pipeline
//!
//! ```text
//! racelab train    --iterations 200 --checkpoint-dir ckpt
//! racelab compile  --checkpoint ckpt/policy-000004.ckpt --out scenarios.rlsc
//! racelab serve    --db scenarios.rlsc   < queries.jsonl
//! racelab strategy --lap 18 --total-laps 57 --compound SOFT --tire-life 17
//! racelab race     --laps 30
//! ```
//!
//! Every stage also runs without its predecessor: `compile` falls back to
//! the rule-based line follower and every command defaults to the built-in
//! reference circuit.

pub mod commands;
pub mod config;
pub mod watcher;

pub use ml;
pub use physics;
pub use rl;
pub use scenario;
pub use track;
