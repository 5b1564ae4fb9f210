//! Worker side of the gRPC transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use polycode::{EncodedPair, PartialResult, StragglerPlan, WorkerTransport};
use polycode_types::coded::coded_compute_client::CodedComputeClient;
use polycode_types::coded::{Directive, JoinRequest, SubmitAck, directive};
use tokio::task::JoinHandle;
use tonic::Streaming;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::Error;

const MAX_RETRIES: usize = 8;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// A worker process connected to a gRPC coordinator.
///
/// Connecting retries with exponential backoff (100ms, doubling, at most 8
/// attempts), so workers may be started before the coordinator listens. The
/// worker joins under its ordinal right away and keeps the directive stream
/// for the plan and its block pair.
///
/// # Example
///
/// ```no_run
/// use polycode::run_worker;
/// use polycode_rpc::GrpcWorker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut worker = GrpcWorker::connect("127.0.0.1:50051", 3).await?;
///     run_worker(&mut worker).await?;
///     Ok(())
/// }
/// ```
pub struct GrpcWorker {
    ordinal: u32,
    client: CodedComputeClient<Channel>,
    directives: Streaming<Directive>,
    pending: Vec<JoinHandle<Result<SubmitAck, Error>>>,
}

impl GrpcWorker {
    pub async fn connect(addr: impl Into<ServerAddr>, ordinal: u32) -> Result<Self, Error> {
        let server_addr = addr.into();
        let endpoint = Endpoint::from_shared(format!("http://{}", server_addr.0))?;

        let mut retries = 0;
        let mut delay = INITIAL_BACKOFF;
        let channel = loop {
            match endpoint.connect().await {
                Ok(channel) => break channel,
                Err(e) => {
                    retries += 1;
                    if retries >= MAX_RETRIES {
                        warn!(ordinal, addr = %server_addr, error = %e, "giving up on coordinator");
                        return Err(Error::Unreachable(retries));
                    }
                    debug!(ordinal, attempt = retries, error = %e, "coordinator not reachable yet");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        };

        let mut client = CodedComputeClient::new(channel);
        let directives = client.join(JoinRequest { ordinal }).await?.into_inner();
        info!(ordinal, addr = %server_addr, "joined coordinator");

        Ok(Self {
            ordinal,
            client,
            directives,
            pending: Vec::new(),
        })
    }

    async fn next_directive(&mut self) -> Result<directive::Kind, Error> {
        let directive = self
            .directives
            .message()
            .await?
            .ok_or(Error::ConnectionClosed)?;
        directive
            .kind
            .ok_or_else(|| Error::Malformed("empty directive".to_string()))
    }
}

#[async_trait]
impl WorkerTransport for GrpcWorker {
    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    async fn receive_broadcast(&mut self) -> Result<StragglerPlan, polycode::Error> {
        match self.next_directive().await? {
            directive::Kind::Plan(plan) => Ok(codec::plan_from_proto(plan)?),
            directive::Kind::Blocks(_) => Err(Error::UnexpectedDirective("straggler plan").into()),
        }
    }

    async fn receive_scatter(&mut self) -> Result<EncodedPair, polycode::Error> {
        match self.next_directive().await? {
            directive::Kind::Blocks(pair) => Ok(codec::pair_from_proto(pair)?),
            directive::Kind::Plan(_) => Err(Error::UnexpectedDirective("block pair").into()),
        }
    }

    fn send_async(&mut self, result: PartialResult) -> Result<(), polycode::Error> {
        let mut client = self.client.clone();
        let request = codec::partial_to_proto(result);
        self.pending.push(tokio::spawn(async move {
            let ack = client.submit(request).await?;
            Ok::<_, Error>(ack.into_inner())
        }));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), polycode::Error> {
        let ordinal = self.ordinal;
        for handle in self.pending.drain(..) {
            match handle.await? {
                Ok(ack) if ack.accepted => debug!(ordinal, "reply accepted"),
                Ok(ack) => info!(ordinal, reason = %ack.error, "reply not needed"),
                Err(e) => warn!(ordinal, error = %e, "reply delivery failed"),
            }
        }
        Ok(())
    }
}

/// Server address wrapper for type-safe connection.
#[derive(Clone, Debug)]
pub struct ServerAddr(pub String);

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServerAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<std::net::SocketAddr> for ServerAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr.to_string())
    }
}
