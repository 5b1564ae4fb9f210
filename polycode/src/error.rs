//! Error types for polynomial-coded multiplication.

use thiserror::Error;

/// Boxed source error produced by a transport implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("insufficient quorum: received {received} of {needed} distinct replies")]
    InsufficientQuorum { received: usize, needed: usize },

    #[error("numeric reconstruction failed at cell ({row}, {col}): {detail}")]
    NumericReconstruction {
        row: usize,
        col: usize,
        detail: String,
    },

    #[error("reply from point {point} is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    MalformedReply {
        point: u32,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("integer overflow during {0}")]
    Overflow(&'static str),

    #[error("block pair for point {got} delivered to worker {expected}")]
    Misrouted { expected: u32, got: u32 },

    #[error("participant {0} disconnected")]
    Disconnected(u32),

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Problems detected before any communication takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{dimension} = {value} is not divisible by {blocks} = {count}")]
    NotDivisible {
        dimension: &'static str,
        value: usize,
        blocks: &'static str,
        count: usize,
    },

    #[error("{0} must be nonzero")]
    Zero(&'static str),

    #[error("matrix {name} is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        name: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error(
        "{world_size} processes cannot reach a quorum of {needed}: at least {} are required",
        .needed + 1
    )]
    InsufficientWorkers { world_size: usize, needed: usize },

    #[error("cannot mark {requested} stragglers among {available} workers")]
    TooManyStragglers { requested: usize, available: usize },

    #[error("straggler ordinal {0} is not a worker")]
    InvalidStraggler(u32),

    #[error("evaluation point must be nonzero; ordinal 0 is the coordinator")]
    ReservedPoint,
}
