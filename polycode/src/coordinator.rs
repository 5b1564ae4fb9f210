//! Coordinator-side protocol: encode, distribute, collect, decode.

use std::time::Duration;

use rand::Rng;
use tracing::{error, info};

use crate::config::{RunConfig, StragglerPlan};
use crate::decoder::PolynomialDecoder;
use crate::encoder::PolynomialEncoder;
use crate::error::{ConfigError, Error};
use crate::matrix::Matrix;
use crate::partition::BlockGeometry;
use crate::quorum::QuorumCollector;
use crate::timing::StageTimer;
use crate::transport::CoordinatorTransport;
use crate::types::EvaluationPoint;

/// Per-stage durations of one run and the points that formed the quorum.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub encode: Duration,
    pub distribute: Duration,
    pub collect: Duration,
    pub decode: Duration,
    pub quorum: Vec<EvaluationPoint>,
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub product: Matrix,
    pub report: RunReport,
}

pub struct Coordinator {
    config: RunConfig,
    geometry: BlockGeometry,
}

impl Coordinator {
    /// Validates the configuration; nothing is sent before this succeeds.
    pub fn new(config: RunConfig) -> Result<Self, Error> {
        let geometry = config.validate()?;
        info!(
            world_size = config.world_size,
            needed = geometry.quorum_size(),
            subrow = geometry.subrow,
            subcol_a = geometry.subcol_a,
            subcol_b = geometry.subcol_b,
            "configuration accepted"
        );
        Ok(Self { config, geometry })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Draws the run's straggler set.
    pub fn plan_stragglers<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<StragglerPlan, Error> {
        let plan = StragglerPlan::random(
            self.config.policy,
            self.config.world_size,
            self.config.straggler_count,
            rng,
        )?;
        Ok(plan)
    }

    /// Computes `Aᵀ · B` with the workers behind `transport`.
    pub async fn run<T>(
        &self,
        transport: &mut T,
        a: &Matrix,
        b: &Matrix,
        plan: &StragglerPlan,
    ) -> Result<RunOutcome, Error>
    where
        T: CoordinatorTransport + ?Sized,
    {
        if transport.world_size() != self.config.world_size {
            return Err(Error::Transport(
                format!(
                    "transport spans {} participants, configuration expects {}",
                    transport.world_size(),
                    self.config.world_size
                )
                .into(),
            ));
        }
        if let Some(outsider) = plan
            .stragglers
            .iter()
            .find(|point| point.get() as usize >= self.config.world_size)
        {
            return Err(ConfigError::InvalidStraggler(outsider.get()).into());
        }
        let mut report = RunReport::default();

        let timer = StageTimer::start("encode");
        let blocks = PolynomialEncoder::new(self.geometry, self.config.world_size)
            .map_err(Error::from)
            .and_then(|encoder| encoder.encode(a, b))
            .inspect_err(|e| error!(stage = "encode", error = %e, "stage failed"))?;
        report.encode = timer.stop();

        let timer = StageTimer::start("distribute");
        transport
            .broadcast(plan)
            .await
            .inspect_err(|e| error!(stage = "broadcast", error = %e, "stage failed"))?;
        transport
            .scatter(blocks)
            .await
            .inspect_err(|e| error!(stage = "scatter", error = %e, "stage failed"))?;
        report.distribute = timer.stop();

        let timer = StageTimer::start("collect");
        let collected = QuorumCollector::new(
            self.geometry.quorum_size(),
            self.geometry.partial_shape(),
            self.config.deadline,
        )
        .collect(transport)
        .await;
        transport.close();
        let quorum =
            collected.inspect_err(|e| error!(stage = "collect", error = %e, "stage failed"))?;
        report.collect = timer.stop();
        report.quorum = quorum.points();

        let timer = StageTimer::start("decode");
        let product = PolynomialDecoder::new(self.geometry)
            .decode(&quorum)
            .inspect_err(|e| error!(stage = "decode", error = %e, "stage failed"))?;
        report.decode = timer.stop();

        info!(
            encode_ms = report.encode.as_millis() as u64,
            distribute_ms = report.distribute.as_millis() as u64,
            collect_ms = report.collect.as_millis() as u64,
            decode_ms = report.decode.as_millis() as u64,
            "run complete"
        );
        Ok(RunOutcome { product, report })
    }
}
