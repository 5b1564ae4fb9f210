//! Message-passing seams between the coordinator and its workers.
//!
//! The coordinator side offers the two collectives (broadcast of the
//! straggler plan, scatter of encoded blocks) and a receive-from-any that
//! yields replies tagged with their sender. The worker side mirrors it and
//! posts its reply without waiting for an acknowledgement.

use async_trait::async_trait;

use crate::config::StragglerPlan;
use crate::error::Error;
use crate::types::{EncodedPair, PartialResult};

pub mod local;

pub use local::{LocalCoordinator, LocalWorker, local_network};

#[async_trait]
pub trait CoordinatorTransport: Send {
    /// Number of participants including the coordinator.
    fn world_size(&self) -> usize;

    /// Delivers the straggler plan to every worker.
    async fn broadcast(&mut self, plan: &StragglerPlan) -> Result<(), Error>;

    /// Delivers each pair to the worker whose ordinal equals its point.
    async fn scatter(&mut self, blocks: Vec<EncodedPair>) -> Result<(), Error>;

    /// Waits for the next reply from any worker.
    ///
    /// Returns `None` once no worker can send anymore.
    async fn receive_any(&mut self) -> Result<Option<PartialResult>, Error>;

    /// Stops accepting replies. Workers that post afterwards are told their
    /// result is no longer needed.
    fn close(&mut self);
}

#[async_trait]
pub trait WorkerTransport: Send {
    fn ordinal(&self) -> u32;

    async fn receive_broadcast(&mut self) -> Result<StragglerPlan, Error>;

    async fn receive_scatter(&mut self) -> Result<EncodedPair, Error>;

    /// Posts a reply to the coordinator and returns immediately.
    fn send_async(&mut self, result: PartialResult) -> Result<(), Error>;

    /// Waits until posted replies have left. A reply the coordinator no longer
    /// needs is not an error.
    async fn flush(&mut self) -> Result<(), Error>;
}
