//! Error types for matrix-mul operations.

use polycode::Matrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Polycode(#[from] polycode::Error),

    #[error("transport error: {0}")]
    Rpc(#[from] polycode_rpc::Error),

    #[error("decoded product differs from AᵀB computed directly")]
    Verification { decoded: Matrix, direct: Matrix },
}

impl From<polycode::ConfigError> for Error {
    fn from(err: polycode::ConfigError) -> Self {
        Self::Polycode(err.into())
    }
}
