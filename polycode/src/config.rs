//! Immutable run configuration shared by every component of a run.

use std::collections::BTreeSet;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::partition::{BlockCounts, BlockGeometry, Dimensions};
use crate::types::EvaluationPoint;

pub const DEFAULT_MAX_VALUE: i64 = 10;
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(1);
pub const DEFAULT_REPEAT: u32 = 10;

/// How the designated stragglers slow themselves down. One policy per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StragglerPolicy {
    /// Pause for the given duration before replying.
    Sleep(Duration),
    /// Compute the product this many times in total before replying.
    Repeat(u32),
}

impl Default for StragglerPolicy {
    fn default() -> Self {
        Self::Sleep(DEFAULT_SLEEP)
    }
}

/// The value broadcast to every worker at the start of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StragglerPlan {
    pub policy: StragglerPolicy,
    pub stragglers: BTreeSet<EvaluationPoint>,
}

impl StragglerPlan {
    pub fn new(policy: StragglerPolicy, stragglers: impl IntoIterator<Item = EvaluationPoint>) -> Self {
        Self {
            policy,
            stragglers: stragglers.into_iter().collect(),
        }
    }

    /// Picks `count` distinct worker ordinals out of `1..world_size`.
    pub fn random<R: Rng + ?Sized>(
        policy: StragglerPolicy,
        world_size: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let workers = world_size.saturating_sub(1);
        if count > workers {
            return Err(ConfigError::TooManyStragglers {
                requested: count,
                available: workers,
            });
        }

        let mut ordinals: Vec<u32> = (1..world_size as u32).collect();
        ordinals.shuffle(rng);
        let stragglers: BTreeSet<EvaluationPoint> = ordinals
            .into_iter()
            .take(count)
            .map(EvaluationPoint::new)
            .collect::<Result<_, _>>()?;

        Ok(Self { policy, stragglers })
    }

    pub fn is_straggler(&self, point: EvaluationPoint) -> bool {
        self.stragglers.contains(&point)
    }
}

/// Every parameter of a run, constructed once and passed explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub dims: Dimensions,
    pub blocks: BlockCounts,
    /// Number of processes including the coordinator (ordinal 0).
    pub world_size: usize,
    /// Exclusive upper bound for generated input values.
    pub max_value: i64,
    pub straggler_count: usize,
    pub policy: StragglerPolicy,
    /// Bound on quorum collection; `None` waits for as long as workers stay connected.
    pub deadline: Option<Duration>,
}

impl RunConfig {
    pub fn new(dims: Dimensions, blocks: BlockCounts, world_size: usize) -> Self {
        Self {
            dims,
            blocks,
            world_size,
            max_value: DEFAULT_MAX_VALUE,
            straggler_count: 0,
            policy: StragglerPolicy::default(),
            deadline: None,
        }
    }

    /// Checks the whole configuration and returns the block geometry.
    pub fn validate(&self) -> Result<BlockGeometry, ConfigError> {
        let geometry = BlockGeometry::new(self.dims, self.blocks)?;

        let needed = geometry.quorum_size();
        if self.world_size < needed + 1 {
            return Err(ConfigError::InsufficientWorkers {
                world_size: self.world_size,
                needed,
            });
        }
        if self.straggler_count > self.world_size - 1 {
            return Err(ConfigError::TooManyStragglers {
                requested: self.straggler_count,
                available: self.world_size - 1,
            });
        }
        if self.max_value <= 0 {
            return Err(ConfigError::Zero("max"));
        }
        if let StragglerPolicy::Repeat(0) = self.policy {
            return Err(ConfigError::Zero("repeat"));
        }

        Ok(geometry)
    }
}
