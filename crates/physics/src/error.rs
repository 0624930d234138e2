use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Integration produced a NaN or infinite value.
    #[error("simulation diverged: `{quantity}` is not finite")]
    SimulationDivergence { quantity: &'static str },
    #[error("invalid timestep {0}")]
    InvalidTimestep(f32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
