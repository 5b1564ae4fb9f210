//! Collection of the first `n_needed` distinct worker replies.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::transport::CoordinatorTransport;
use crate::types::{EvaluationPoint, PartialResult};

/// What happened to a reply offered to a [`Quorum`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    /// Recorded; `received` distinct replies are now held.
    Accepted { received: usize },
    /// Recorded, and the quorum is now complete.
    Complete,
    /// A reply from this point was already recorded.
    Duplicate,
    /// The reply has the wrong shape for this run.
    Malformed,
    /// The quorum was already complete.
    Surplus,
}

/// Pure reducer over tagged replies: keeps the first reply from each point
/// until `needed` distinct points have been seen.
#[derive(Debug)]
pub struct Quorum {
    needed: usize,
    shape: Option<(usize, usize)>,
    seen: HashSet<EvaluationPoint>,
    replies: Vec<PartialResult>,
}

impl Quorum {
    pub fn new(needed: usize) -> Self {
        Self {
            needed,
            shape: None,
            seen: HashSet::with_capacity(needed),
            replies: Vec::with_capacity(needed),
        }
    }

    /// Also rejects replies whose matrix is not `shape`.
    pub fn with_shape(needed: usize, shape: (usize, usize)) -> Self {
        Self {
            shape: Some(shape),
            ..Self::new(needed)
        }
    }

    pub fn offer(&mut self, reply: PartialResult) -> Offer {
        if self.is_complete() {
            return Offer::Surplus;
        }
        if self.shape.is_some_and(|shape| shape != reply.value.shape()) {
            return Offer::Malformed;
        }
        if !self.seen.insert(reply.point) {
            return Offer::Duplicate;
        }

        self.replies.push(reply);
        if self.is_complete() {
            Offer::Complete
        } else {
            Offer::Accepted {
                received: self.replies.len(),
            }
        }
    }

    pub fn received(&self) -> usize {
        self.replies.len()
    }

    pub fn needed(&self) -> usize {
        self.needed
    }

    pub fn is_complete(&self) -> bool {
        self.replies.len() >= self.needed
    }

    pub fn finish(self) -> Result<ResultQuorum, Error> {
        if !self.is_complete() {
            return Err(Error::InsufficientQuorum {
                received: self.replies.len(),
                needed: self.needed,
            });
        }
        Ok(ResultQuorum {
            replies: self.replies,
        })
    }
}

/// Exactly `n_needed` replies with pairwise distinct evaluation points.
#[derive(Clone, Debug)]
pub struct ResultQuorum {
    replies: Vec<PartialResult>,
}

impl ResultQuorum {
    /// Keeps the first `needed` distinct replies of `replies`.
    pub fn from_replies(
        needed: usize,
        replies: impl IntoIterator<Item = PartialResult>,
    ) -> Result<Self, Error> {
        let mut quorum = Quorum::new(needed);
        for reply in replies {
            if quorum.offer(reply) == Offer::Complete {
                break;
            }
        }
        quorum.finish()
    }

    pub fn replies(&self) -> &[PartialResult] {
        &self.replies
    }

    pub fn points(&self) -> Vec<EvaluationPoint> {
        self.replies.iter().map(|reply| reply.point).collect()
    }
}

/// Drives a [`Quorum`] from a coordinator transport, optionally bounded by a deadline.
pub struct QuorumCollector {
    needed: usize,
    shape: (usize, usize),
    deadline: Option<Duration>,
}

impl QuorumCollector {
    pub fn new(needed: usize, shape: (usize, usize), deadline: Option<Duration>) -> Self {
        Self {
            needed,
            shape,
            deadline,
        }
    }

    pub async fn collect<T>(&self, transport: &mut T) -> Result<ResultQuorum, Error>
    where
        T: CoordinatorTransport + ?Sized,
    {
        let mut quorum = Quorum::with_shape(self.needed, self.shape);
        let expires = self.deadline.map(|d| Instant::now() + d);

        while !quorum.is_complete() {
            let next = match expires {
                Some(at) => match tokio::time::timeout_at(at, transport.receive_any()).await {
                    Ok(next) => next?,
                    Err(_) => {
                        warn!(
                            received = quorum.received(),
                            needed = self.needed,
                            "quorum deadline elapsed"
                        );
                        break;
                    }
                },
                None => transport.receive_any().await?,
            };

            let Some(reply) = next else {
                warn!(
                    received = quorum.received(),
                    needed = self.needed,
                    "all workers hung up before quorum"
                );
                break;
            };

            let point = reply.point.get();
            match quorum.offer(reply) {
                Offer::Accepted { received } => {
                    debug!(point, received, needed = self.needed, "reply accepted")
                }
                Offer::Complete => info!(point, needed = self.needed, "quorum complete"),
                Offer::Duplicate => warn!(point, "duplicate reply ignored"),
                Offer::Malformed => warn!(point, "reply with wrong shape ignored"),
                Offer::Surplus => {}
            }
        }

        quorum.finish()
    }
}
