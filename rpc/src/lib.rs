//! gRPC transport for `polycode`.
//!
//! [`GrpcCoordinator`] serves the `CodedCompute` service and implements
//! [`polycode::CoordinatorTransport`]; [`GrpcWorker`] connects to it and
//! implements [`polycode::WorkerTransport`]. The protocol drivers
//! ([`polycode::Coordinator::run`], [`polycode::run_worker`]) run unchanged
//! on top of either.
//!
//! # Example
//!
//! ```no_run
//! use polycode::{BlockCounts, Coordinator, Dimensions, Matrix, RunConfig};
//! use polycode_rpc::GrpcCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::new(
//!         Dimensions { r: 4, s: 2, t: 4 },
//!         BlockCounts { p: 2, m: 2, n: 2 },
//!         10,
//!     );
//!     let coordinator = Coordinator::new(config)?;
//!     let mut transport = GrpcCoordinator::bind("127.0.0.1:50051".parse()?, 10).await?;
//!
//!     // Workers 1..=9 connect with `GrpcWorker::connect` and call `run_worker`.
//!     let a = Matrix::filled(2, 4, 1);
//!     let plan = coordinator.plan_stragglers(&mut rand::thread_rng())?;
//!     let outcome = coordinator.run(&mut transport, &a, &a, &plan).await?;
//!     println!("{}", outcome.product);
//!     transport.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod client;
pub mod codec;
mod error;
mod grpc;

pub use client::{GrpcWorker, ServerAddr};
pub use error::Error;
pub use grpc::{CodedComputeService, GrpcCoordinator};
