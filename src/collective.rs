//! Sum reduction to a single coordinator.
//!
//! Every participant contributes exactly one value per round, only rank 0
//! sees the total, and nobody returns before all contributions are in.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Barrier, Mutex};

use crate::error::{Error, Result};

pub const COORDINATOR: usize = 0;

#[async_trait]
pub trait Collective: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Contribute `value` to this round's sum. Returns `Some(total)` at the
    /// coordinator and `None` everywhere else.
    async fn reduce_sum(&self, value: u64) -> Result<Option<u64>>;
}

/// Plain sum of a round's tallies.
pub fn reduce(tallies: &[u64]) -> u64 {
    tallies.iter().sum()
}

/// One member of an in-process group.
///
/// Peers send their contributions over a channel into the coordinator, which
/// holds no sender of its own: once every peer is gone the channel closes and
/// the round fails instead of waiting forever. A single lost peer still
/// stalls the round until the group aborts it. A shared barrier holds every
/// member until the coordinator has drained the whole round.
pub struct LocalCollective {
    rank: usize,
    size: usize,
    outbox: Option<mpsc::Sender<u64>>,
    inbox: Option<Mutex<mpsc::Receiver<u64>>>,
    barrier: Arc<Barrier>,
}

impl LocalCollective {
    /// Builds the members of a group of `size`, indexed by rank.
    pub fn group(size: usize) -> Result<Vec<LocalCollective>> {
        if size == 0 {
            return Err(Error::invalid("a group needs at least one member"));
        }

        let (tx, rx) = mpsc::channel(size);
        let barrier = Arc::new(Barrier::new(size));
        let mut inbox = Some(Mutex::new(rx));

        Ok((0..size)
            .map(|rank| {
                let coordinator = rank == COORDINATOR;
                LocalCollective {
                    rank,
                    size,
                    outbox: (!coordinator).then(|| tx.clone()),
                    inbox: if coordinator { inbox.take() } else { None },
                    barrier: Arc::clone(&barrier),
                }
            })
            .collect())
    }

    async fn drain_round(&self, own: u64, inbox: &Mutex<mpsc::Receiver<u64>>) -> Result<u64> {
        let mut rx = inbox.lock().await;
        let mut tallies = Vec::with_capacity(self.size);
        tallies.push(own);
        while tallies.len() < self.size {
            match rx.recv().await {
                Some(value) => tallies.push(value),
                None => {
                    return Err(Error::ReductionClosed {
                        missing: self.size - tallies.len(),
                    })
                }
            }
        }
        Ok(reduce(&tallies))
    }
}

#[async_trait]
impl Collective for LocalCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn reduce_sum(&self, value: u64) -> Result<Option<u64>> {
        let total = match &self.inbox {
            Some(inbox) => Some(self.drain_round(value, inbox).await?),
            None => {
                if let Some(outbox) = &self.outbox {
                    outbox
                        .send(value)
                        .await
                        .map_err(|_| Error::WorkerLost { rank: COORDINATOR })?;
                }
                None
            }
        };

        self.barrier.wait().await;
        Ok(total)
    }
}
