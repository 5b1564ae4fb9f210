//! In-process transport over tokio channels.
//!
//! Each worker owns a directive inbox; all workers share one fan-in channel
//! towards the coordinator. Collectives complete as soon as every reachable
//! worker has its copy queued.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use super::{CoordinatorTransport, WorkerTransport};
use crate::config::StragglerPlan;
use crate::error::Error;
use crate::types::{EncodedPair, PartialResult};

#[derive(Debug)]
enum Directive {
    Plan(StragglerPlan),
    Blocks(EncodedPair),
}

/// Builds a network of one coordinator and `world_size − 1` workers.
pub fn local_network(world_size: usize) -> (LocalCoordinator, Vec<LocalWorker>) {
    let (reply_tx, reply_rx) = unbounded_channel();
    let mut outboxes = BTreeMap::new();
    let mut workers = Vec::with_capacity(world_size.saturating_sub(1));

    for ordinal in 1..world_size as u32 {
        let (tx, rx) = unbounded_channel();
        outboxes.insert(ordinal, tx);
        workers.push(LocalWorker {
            ordinal,
            inbox: rx,
            replies: reply_tx.clone(),
        });
    }

    let coordinator = LocalCoordinator {
        world_size,
        outboxes,
        replies: reply_rx,
    };
    (coordinator, workers)
}

pub struct LocalCoordinator {
    world_size: usize,
    outboxes: BTreeMap<u32, UnboundedSender<Directive>>,
    replies: UnboundedReceiver<PartialResult>,
}

impl LocalCoordinator {
    fn deliver(&self, ordinal: u32, directive: Directive) {
        let Some(outbox) = self.outboxes.get(&ordinal) else {
            warn!(ordinal, "no such worker");
            return;
        };
        if outbox.send(directive).is_err() {
            warn!(ordinal, "worker is gone, skipping");
        }
    }
}

#[async_trait]
impl CoordinatorTransport for LocalCoordinator {
    fn world_size(&self) -> usize {
        self.world_size
    }

    async fn broadcast(&mut self, plan: &StragglerPlan) -> Result<(), Error> {
        for &ordinal in self.outboxes.keys() {
            self.deliver(ordinal, Directive::Plan(plan.clone()));
        }
        Ok(())
    }

    async fn scatter(&mut self, blocks: Vec<EncodedPair>) -> Result<(), Error> {
        for pair in blocks {
            self.deliver(pair.point.get(), Directive::Blocks(pair));
        }
        // Every worker gets exactly one pair; close the inboxes.
        self.outboxes.clear();
        Ok(())
    }

    async fn receive_any(&mut self) -> Result<Option<PartialResult>, Error> {
        Ok(self.replies.recv().await)
    }

    fn close(&mut self) {
        self.replies.close();
    }
}

pub struct LocalWorker {
    ordinal: u32,
    inbox: UnboundedReceiver<Directive>,
    replies: UnboundedSender<PartialResult>,
}

impl LocalWorker {
    async fn next(&mut self) -> Result<Directive, Error> {
        self.inbox
            .recv()
            .await
            .ok_or(Error::Disconnected(0))
    }
}

#[async_trait]
impl WorkerTransport for LocalWorker {
    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    async fn receive_broadcast(&mut self) -> Result<StragglerPlan, Error> {
        match self.next().await? {
            Directive::Plan(plan) => Ok(plan),
            Directive::Blocks(_) => Err(Error::Transport("blocks arrived before the plan".into())),
        }
    }

    async fn receive_scatter(&mut self) -> Result<EncodedPair, Error> {
        match self.next().await? {
            Directive::Blocks(pair) => Ok(pair),
            Directive::Plan(_) => Err(Error::Transport("plan broadcast twice".into())),
        }
    }

    fn send_async(&mut self, result: PartialResult) -> Result<(), Error> {
        if self.replies.send(result).is_err() {
            debug!(ordinal = self.ordinal, "coordinator no longer listening");
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
