//! Worker-side computation and protocol.

use tracing::{debug, info};

use crate::config::{StragglerPlan, StragglerPolicy};
use crate::error::Error;
use crate::timing::StageTimer;
use crate::transport::WorkerTransport;
use crate::types::{EncodedPair, EvaluationPoint, PartialResult};

/// Multiplies one worker's encoded blocks, slowing down if it is a straggler.
#[derive(Clone, Debug)]
pub struct WorkerComputeUnit {
    point: EvaluationPoint,
    policy: StragglerPolicy,
    straggler: bool,
}

impl WorkerComputeUnit {
    pub fn new(point: EvaluationPoint, policy: StragglerPolicy, straggler: bool) -> Self {
        Self {
            point,
            policy,
            straggler,
        }
    }

    pub fn from_plan(point: EvaluationPoint, plan: &StragglerPlan) -> Self {
        Self::new(point, plan.policy, plan.is_straggler(point))
    }

    /// Computes `Ãᵀ · B̃` on the blocking pool and tags it with this worker's point.
    pub async fn compute(&self, pair: EncodedPair) -> Result<PartialResult, Error> {
        if pair.point != self.point {
            return Err(Error::Misrouted {
                expected: self.point.get(),
                got: pair.point.get(),
            });
        }

        let rounds = match (self.straggler, self.policy) {
            (true, StragglerPolicy::Repeat(count)) => count.max(1),
            _ => 1,
        };
        let value = tokio::task::spawn_blocking(move || {
            let mut product = pair.a.transpose_mul(&pair.b)?;
            for _ in 1..rounds {
                product = pair.a.transpose_mul(&pair.b)?;
            }
            Ok::<_, Error>(product)
        })
        .await??;

        if let (true, StragglerPolicy::Sleep(duration)) = (self.straggler, self.policy) {
            debug!(point = self.point.get(), ?duration, "straggling");
            tokio::time::sleep(duration).await;
        }

        Ok(PartialResult {
            point: self.point,
            value,
        })
    }
}

/// Runs one worker: receive the plan and blocks, compute, reply.
pub async fn run_worker<T>(transport: &mut T) -> Result<(), Error>
where
    T: WorkerTransport + ?Sized,
{
    let point = EvaluationPoint::new(transport.ordinal())?;
    let plan = transport.receive_broadcast().await?;
    let pair = transport.receive_scatter().await?;

    let unit = WorkerComputeUnit::from_plan(point, &plan);
    let timer = StageTimer::start("compute");
    let result = unit.compute(pair).await?;
    let elapsed = timer.stop();

    info!(
        ordinal = point.get(),
        straggler = unit.straggler,
        elapsed_ms = elapsed.as_millis() as u64,
        "computed partial result"
    );
    transport.send_async(result)?;
    transport.flush().await
}
