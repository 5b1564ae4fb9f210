//! Values exchanged between the coordinator and the workers.

use std::fmt;

use crate::error::ConfigError;
use crate::matrix::Matrix;

/// The scalar a worker's encoded polynomials are evaluated at: its ordinal.
///
/// Ordinal 0 belongs to the coordinator and is never a valid point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvaluationPoint(u32);

impl EvaluationPoint {
    pub fn new(ordinal: u32) -> Result<Self, ConfigError> {
        if ordinal == 0 {
            return Err(ConfigError::ReservedPoint);
        }
        Ok(Self(ordinal))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for EvaluationPoint {
    type Error = ConfigError;

    fn try_from(ordinal: u32) -> Result<Self, Self::Error> {
        Self::new(ordinal)
    }
}

impl fmt::Display for EvaluationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The encoded blocks `(Ã(x), B̃(x))` destined for the worker at `point`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPair {
    pub point: EvaluationPoint,
    pub a: Matrix,
    pub b: Matrix,
}

/// A worker's product `Ã(x)ᵀ · B̃(x)`, tagged with the point it was evaluated at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialResult {
    pub point: EvaluationPoint,
    pub value: Matrix,
}
