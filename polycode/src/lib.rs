//! Straggler-tolerant distributed matrix multiplication with polynomial codes.
//!
//! `polycode` computes C = Aᵀ·B across `W − 1` workers. Instead of raw blocks,
//! worker `i` receives the matrix polynomials Ã(x), B̃(x) evaluated at
//! `x = i`, multiplies them locally and replies. Any `p·m·n + p − 1` replies
//! determine the product polynomial, whose coefficients are the blocks of C,
//! so the coordinator never waits for the slowest workers.
//!
//! # Pipeline
//!
//! - [`BlockGeometry`] partitions A (s×r) and B (s×t) exactly.
//! - [`PolynomialEncoder`] builds one [`EncodedPair`] per worker.
//! - A [`CoordinatorTransport`] broadcasts the [`StragglerPlan`] and scatters the pairs.
//! - Each worker runs a [`WorkerComputeUnit`] and posts a [`PartialResult`].
//! - [`QuorumCollector`] keeps the first `n_needed` distinct replies.
//! - [`PolynomialDecoder`] interpolates every cell and assembles C.
//!
//! # Example
//!
//! ```no_run
//! use polycode::{
//!     BlockCounts, Coordinator, Dimensions, Matrix, RunConfig, local_network, run_worker,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::new(
//!         Dimensions { r: 4, s: 2, t: 4 },
//!         BlockCounts { p: 2, m: 2, n: 2 },
//!         10,
//!     );
//!     let coordinator = Coordinator::new(config)?;
//!     let (mut transport, workers) = local_network(10);
//!     for mut worker in workers {
//!         tokio::spawn(async move { run_worker(&mut worker).await });
//!     }
//!
//!     let a = Matrix::filled(2, 4, 1);
//!     let b = Matrix::filled(2, 4, 1);
//!     let plan = coordinator.plan_stragglers(&mut rand::thread_rng())?;
//!     let outcome = coordinator.run(&mut transport, &a, &b, &plan).await?;
//!     assert_eq!(outcome.product, a.transpose_mul(&b)?);
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod decoder;
mod encoder;
mod error;
mod matrix;
mod partition;
mod quorum;
mod timing;
pub mod transport;
mod types;
mod worker;

pub use config::{
    DEFAULT_MAX_VALUE, DEFAULT_REPEAT, DEFAULT_SLEEP, RunConfig, StragglerPlan, StragglerPolicy,
};
pub use coordinator::{Coordinator, RunOutcome, RunReport};
pub use decoder::PolynomialDecoder;
pub use encoder::PolynomialEncoder;
pub use error::{ConfigError, Error, TransportError};
pub use matrix::Matrix;
pub use partition::{BlockCounts, BlockGeometry, Dimensions};
pub use quorum::{Offer, Quorum, QuorumCollector, ResultQuorum};
pub use timing::StageTimer;
pub use transport::{CoordinatorTransport, WorkerTransport, local_network};
pub use types::{EncodedPair, EvaluationPoint, PartialResult};
pub use worker::{WorkerComputeUnit, run_worker};
