//! Straggler-tolerant distributed matrix multiplication.
//!
//! `matrix-mul` drives the `polycode` protocol end to end: it generates
//! random inputs, runs the coordinator against in-process or gRPC workers,
//! and checks the decoded product against `Aᵀ·B` computed directly.
//!
//! # Example
//!
//! ```no_run
//! use matrix_mul::MatrixMul;
//! use polycode::{BlockCounts, Dimensions, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = RunConfig::new(
//!         Dimensions { r: 4, s: 2, t: 4 },
//!         BlockCounts { p: 2, m: 2, n: 2 },
//!         12,
//!     );
//!     config.straggler_count = 2;
//!
//!     let mut mm = MatrixMul::new(config, Some(7))?;
//!     let report = mm.run_local().await?;
//!     println!("{}", report.outcome.product);
//!     Ok(())
//! }
//! ```

pub mod cli;
mod error;
mod matrix_mul;

pub use error::Error;
pub use matrix_mul::{MatrixMul, Report, work};
