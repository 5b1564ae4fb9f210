//! Coordinator side of the gRPC transport.
//!
//! Workers call `Join` once and keep the returned directive stream open; the
//! coordinator pushes the straggler plan and then the worker's block pair
//! through it. Replies come back as unary `Submit` calls and are fanned into
//! a single channel drained by [`GrpcCoordinator::receive_any`].

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::Stream;
use polycode::{CoordinatorTransport, EncodedPair, PartialResult, StragglerPlan};
use polycode_types::coded::coded_compute_server::{CodedCompute, CodedComputeServer};
use polycode_types::coded::{self, Directive, JoinRequest, SubmitAck};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::Error;

type DirectiveStream = Pin<Box<dyn Stream<Item = Result<Directive, Status>> + Send>>;

/// How far the run has progressed. Joins are accepted only while `Joining`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Joining,
    Planned,
    Scattered,
}

struct Outboxes {
    phase: Phase,
    by_ordinal: BTreeMap<u32, UnboundedSender<Directive>>,
}

struct Shared {
    world_size: usize,
    outboxes: Mutex<Outboxes>,
    members: watch::Sender<BTreeSet<u32>>,
    replies: UnboundedSender<PartialResult>,
}

#[derive(Clone)]
pub struct CodedComputeService {
    shared: Arc<Shared>,
}

#[tonic::async_trait]
impl CodedCompute for CodedComputeService {
    type JoinStream = DirectiveStream;

    async fn join(
        &self,
        request: Request<JoinRequest>,
    ) -> Result<Response<Self::JoinStream>, Status> {
        let ordinal = request.into_inner().ordinal;
        let world_size = self.shared.world_size;
        if ordinal == 0 || ordinal as usize >= world_size {
            return Err(Status::invalid_argument(format!(
                "ordinal {ordinal} is outside 1..{world_size}"
            )));
        }

        let (tx, mut rx) = unbounded_channel();
        {
            let mut outboxes = self.shared.outboxes.lock().await;
            match outboxes.phase {
                Phase::Joining => {}
                Phase::Planned => {
                    return Err(Status::failed_precondition("plan already broadcast"));
                }
                Phase::Scattered => {
                    return Err(Status::failed_precondition("blocks already distributed"));
                }
            }
            // A worker whose stream dropped may join again.
            if matches!(outboxes.by_ordinal.get(&ordinal), Some(live) if !live.is_closed()) {
                return Err(Status::already_exists(format!(
                    "ordinal {ordinal} already joined"
                )));
            }
            outboxes.by_ordinal.insert(ordinal, tx);
        }
        self.shared.members.send_modify(|members| {
            members.insert(ordinal);
        });
        info!(ordinal, "worker joined");

        let output = async_stream::stream! {
            while let Some(directive) = rx.recv().await {
                yield Ok(directive);
            }
        };

        Ok(Response::new(Box::pin(output)))
    }

    async fn submit(
        &self,
        request: Request<coded::PartialResult>,
    ) -> Result<Response<SubmitAck>, Status> {
        let result = codec::partial_from_proto(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        let ordinal = result.point.get();
        if !self.shared.members.borrow().contains(&ordinal) {
            return Err(Status::permission_denied(format!(
                "ordinal {ordinal} never joined"
            )));
        }

        let ack = match self.shared.replies.send(result) {
            Ok(()) => {
                debug!(ordinal, "reply queued");
                SubmitAck {
                    accepted: true,
                    error: String::new(),
                }
            }
            Err(_) => {
                debug!(ordinal, "reply arrived after quorum");
                SubmitAck {
                    accepted: false,
                    error: "quorum already complete".to_string(),
                }
            }
        };
        Ok(Response::new(ack))
    }
}

/// Serves `CodedCompute` and drives the coordinator end of a run.
///
/// The server task lives as long as this value; dropping it aborts the
/// server, [`GrpcCoordinator::shutdown`] stops it gracefully.
pub struct GrpcCoordinator {
    shared: Arc<Shared>,
    replies: UnboundedReceiver<PartialResult>,
    local_addr: SocketAddr,
    join_timeout: Option<Duration>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl GrpcCoordinator {
    /// Binds `addr` and starts serving a run of `world_size` participants.
    pub async fn bind(addr: SocketAddr, world_size: usize) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        Self::from_listener(listener, world_size)
    }

    /// Serves on an already bound listener. Must be called from within a
    /// tokio runtime.
    pub fn from_listener(listener: TcpListener, world_size: usize) -> Result<Self, Error> {
        let local_addr = listener.local_addr()?;
        let (reply_tx, reply_rx) = unbounded_channel();
        let (members, _) = watch::channel(BTreeSet::new());
        let shared = Arc::new(Shared {
            world_size,
            outboxes: Mutex::new(Outboxes {
                phase: Phase::Joining,
                by_ordinal: BTreeMap::new(),
            }),
            members,
            replies: reply_tx,
        });

        let service = CodedComputeServer::new(CodedComputeService {
            shared: Arc::clone(&shared),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            Server::builder()
                .add_service(service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    shutdown_rx.await.ok();
                })
                .await
        });
        info!(%local_addr, world_size, "coordinator listening");

        Ok(Self {
            shared,
            replies: reply_rx,
            local_addr,
            join_timeout: None,
            shutdown: Some(shutdown_tx),
            server,
        })
    }

    /// Bounds how long the broadcast waits for every worker to join.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ordinals that have joined so far.
    pub fn members(&self) -> BTreeSet<u32> {
        self.shared.members.borrow().clone()
    }

    /// Closes every directive stream and waits for the server to stop.
    pub async fn shutdown(mut self) -> Result<(), Error> {
        self.shared.outboxes.lock().await.by_ordinal.clear();
        if let Some(signal) = self.shutdown.take() {
            let _ = signal.send(());
        }
        match (&mut self.server).await {
            Ok(served) => Ok(served?),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn await_members(&self) -> Result<(), Error> {
        let expected = self.shared.world_size.saturating_sub(1);
        let mut members = self.shared.members.subscribe();
        let barrier = async move {
            members
                .wait_for(|joined| joined.len() >= expected)
                .await
                .map(|_| ())
        };

        let reached = match self.join_timeout {
            Some(limit) => tokio::time::timeout(limit, barrier).await.ok(),
            None => Some(barrier.await),
        };
        match reached {
            Some(Ok(())) => {
                info!(joined = expected, "all workers joined");
                Ok(())
            }
            Some(Err(_)) => Err(Error::ConnectionClosed),
            None => Err(Error::JoinTimeout {
                joined: self.shared.members.borrow().len(),
                expected,
            }),
        }
    }
}

impl Drop for GrpcCoordinator {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait]
impl CoordinatorTransport for GrpcCoordinator {
    fn world_size(&self) -> usize {
        self.shared.world_size
    }

    async fn broadcast(&mut self, plan: &StragglerPlan) -> Result<(), polycode::Error> {
        self.await_members().await?;

        let directive = codec::plan_directive(plan);
        let mut outboxes = self.shared.outboxes.lock().await;
        outboxes.phase = Phase::Planned;
        for (&ordinal, outbox) in &outboxes.by_ordinal {
            if outbox.send(directive.clone()).is_err() {
                warn!(ordinal, "worker is gone, skipping");
            }
        }
        Ok(())
    }

    async fn scatter(&mut self, blocks: Vec<EncodedPair>) -> Result<(), polycode::Error> {
        let mut outboxes = {
            let mut guard = self.shared.outboxes.lock().await;
            guard.phase = Phase::Scattered;
            std::mem::take(&mut guard.by_ordinal)
        };

        for pair in blocks {
            let ordinal = pair.point.get();
            match outboxes.remove(&ordinal) {
                Some(outbox) => {
                    if outbox.send(codec::blocks_directive(pair)).is_err() {
                        warn!(ordinal, "worker is gone, skipping");
                    }
                }
                None => warn!(ordinal, "no such worker"),
            }
        }
        // Remaining senders drop here, ending every directive stream.
        Ok(())
    }

    async fn receive_any(&mut self) -> Result<Option<PartialResult>, polycode::Error> {
        Ok(self.replies.recv().await)
    }

    fn close(&mut self) {
        self.replies.close();
    }
}
