//! # Precomputed racing scenarios
//!
//! The offline half of the pipeline drives a policy across a grid of
//! (position, speed, compound, weather) situations and stores what it did
//! and what it cost in a [`ScenarioDatabase`]. The online half answers
//! live queries from an immutable [`ScenarioIndex`] under a latency budget,
//! via a [`LookupService`] that can swap in a newly compiled index while
//! queries keep running.
//!
//! A lookup never hands back a bare guess: every [`Recommendation`] carries
//! a confidence and a [`Coverage`] flag, and situations the database does
//! not cover come back as [`ScenarioError::NoCoverage`] or
//! [`ScenarioError::QueryTimeout`] so the caller can fall back.

pub mod compiler;
pub mod database;
pub mod error;
pub mod index;
pub mod key;
pub mod record;
pub mod service;

pub use compiler::{compile, Compilation, CompileStats, CompilerConfig, PolicySource};
pub use database::{checksum, DatabaseMeta, ScenarioDatabase, SCHEMA_VERSION};
pub use error::ScenarioError;
pub use index::{LookupConfig, ScenarioIndex};
pub use key::{LiveQuery, SamplingGrid, ScenarioKey};
pub use record::{Coverage, Recommendation, ScenarioRecord};
pub use service::{AggregateStats, LookupService};
