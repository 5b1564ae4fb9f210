//! Error types for the gRPC transport.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("gRPC status error: {0}")]
    Status(#[from] tonic::Status),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("expected {0} from the coordinator")]
    UnexpectedDirective(&'static str),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("timed out with {joined} of {expected} workers joined")]
    JoinTimeout { joined: usize, expected: usize },

    #[error("coordinator unreachable after {0} attempts")]
    Unreachable(usize),

    #[error("server task failed: {0}")]
    Server(#[from] tokio::task::JoinError),
}

impl From<Error> for polycode::Error {
    fn from(err: Error) -> Self {
        polycode::Error::Transport(Box::new(err))
    }
}
