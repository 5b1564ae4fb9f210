//! Runs of the coded multiplication with generated inputs.

use std::net::SocketAddr;
use std::time::Duration;

use polycode::{
    Coordinator, CoordinatorTransport, Matrix, RunConfig, RunOutcome, local_network, run_worker,
};
use polycode_rpc::{GrpcCoordinator, GrpcWorker, ServerAddr};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::Error;

/// Everything a coordinator run produced, already checked against `Aᵀ·B`.
#[derive(Clone, Debug)]
pub struct Report {
    pub a: Matrix,
    pub b: Matrix,
    pub direct: Matrix,
    pub outcome: RunOutcome,
}

/// Coordinator for one multiplication with random inputs.
///
/// Inputs are drawn uniformly from `[0, max)`; with a seed the inputs and
/// the straggler set are reproducible.
pub struct MatrixMul {
    coordinator: Coordinator,
    rng: StdRng,
}

impl MatrixMul {
    pub fn new(config: RunConfig, seed: Option<u64>) -> Result<Self, Error> {
        let coordinator = Coordinator::new(config)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { coordinator, rng })
    }

    pub fn config(&self) -> &RunConfig {
        self.coordinator.config()
    }

    /// Draws A (s×r) and B (s×t).
    pub fn generate_inputs(&mut self) -> (Matrix, Matrix) {
        let dims = self.config().dims;
        let max = self.config().max_value;
        let rng = &mut self.rng;
        let a = Matrix::from_fn(dims.s, dims.r, |_, _| rng.gen_range(0..max));
        let b = Matrix::from_fn(dims.s, dims.t, |_, _| rng.gen_range(0..max));
        (a, b)
    }

    /// Runs the coordinator and every worker as tasks of this process.
    ///
    /// Workers still busy once the quorum is decoded are aborted.
    pub async fn run_local(&mut self) -> Result<Report, Error> {
        let (mut transport, endpoints) = local_network(self.config().world_size);
        let mut workers = JoinSet::new();
        for mut endpoint in endpoints {
            workers.spawn(async move { run_worker(&mut endpoint).await });
        }

        let report = self.run_with(&mut transport).await;

        while let Some(finished) = workers.try_join_next() {
            match finished {
                Ok(Err(e)) => warn!(error = %e, "worker failed"),
                Err(e) => warn!(error = %e, "worker task failed"),
                Ok(Ok(())) => {}
            }
        }
        if !workers.is_empty() {
            info!(aborted = workers.len(), "aborting stragglers");
        }
        workers.shutdown().await;
        report
    }

    /// Serves the gRPC coordinator on `listen` and runs once every worker joined.
    pub async fn coordinate(
        &mut self,
        listen: SocketAddr,
        join_timeout: Option<Duration>,
    ) -> Result<Report, Error> {
        let mut transport = GrpcCoordinator::bind(listen, self.config().world_size).await?;
        if let Some(timeout) = join_timeout {
            transport = transport.with_join_timeout(timeout);
        }

        let report = self.run_with(&mut transport).await;
        transport.shutdown().await?;
        report
    }

    async fn run_with<T>(&mut self, transport: &mut T) -> Result<Report, Error>
    where
        T: CoordinatorTransport + ?Sized,
    {
        let (a, b) = self.generate_inputs();
        let plan = self.coordinator.plan_stragglers(&mut self.rng)?;
        info!(stragglers = ?plan.stragglers, policy = ?plan.policy, "straggler plan");

        let outcome = self.coordinator.run(transport, &a, &b, &plan).await?;
        let direct = a.transpose_mul(&b)?;
        if outcome.product != direct {
            return Err(Error::Verification {
                decoded: outcome.product,
                direct,
            });
        }

        Ok(Report {
            a,
            b,
            direct,
            outcome,
        })
    }
}

/// Runs one worker process against the coordinator at `addr`.
pub async fn work(addr: impl Into<ServerAddr>, ordinal: u32) -> Result<(), Error> {
    let mut worker = GrpcWorker::connect(addr, ordinal).await?;
    run_worker(&mut worker).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use polycode::{BlockCounts, Dimensions};

    use super::*;

    fn config() -> RunConfig {
        RunConfig::new(
            Dimensions { r: 4, s: 2, t: 4 },
            BlockCounts { p: 2, m: 2, n: 2 },
            10,
        )
    }

    #[test]
    fn seeded_inputs_are_reproducible_and_bounded() {
        let mut first = MatrixMul::new(config(), Some(11)).unwrap();
        let mut second = MatrixMul::new(config(), Some(11)).unwrap();

        let (a, b) = first.generate_inputs();
        assert_eq!((a.clone(), b.clone()), second.generate_inputs());
        assert_eq!(a.shape(), (2, 4));
        assert_eq!(b.shape(), (2, 4));
        assert!(a.as_slice().iter().chain(b.as_slice()).all(|v| (0..10).contains(v)));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = config();
        config.world_size = 5;
        assert!(matches!(
            MatrixMul::new(config, None),
            Err(Error::Polycode(polycode::Error::Configuration(_)))
        ));
    }
}
