//! In-process worker group: bootstraps the ranks, runs the sweep on all of
//! them, and tears everything down if any one fails.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::collective::{Collective, LocalCollective};
use crate::config::RunOptions;
use crate::error::{Error, Result};
use crate::run::{AggregateResult, EstimationRun};
use crate::sink::ResultSink;
use crate::sweep::Sweep;

pub struct WorkerGroup {
    options: RunOptions,
}

impl WorkerGroup {
    pub fn new(options: RunOptions) -> Result<Self> {
        options.validate()?;
        Ok(WorkerGroup { options })
    }

    pub fn workers(&self) -> usize {
        self.options.workers
    }

    /// Runs `sweep` on every rank. The sink must already be open; it moves to
    /// the coordinator and is dropped when the coordinator finishes or the
    /// group is aborted.
    pub async fn run(
        &self,
        sweep: &Sweep,
        sink: Box<dyn ResultSink>,
    ) -> Result<Vec<AggregateResult>> {
        let seed_base = self.options.seed.base();
        info!(
            workers = self.workers(),
            configurations = sweep.len(),
            seed_base,
            "starting run"
        );

        let mut sink = Some(sink);
        let mut runs = Vec::with_capacity(self.workers());
        for member in LocalCollective::group(self.workers())? {
            let mut run = EstimationRun::new(member, self.options, seed_base);
            if run.is_coordinator() {
                if let Some(sink) = sink.take() {
                    run = run.with_sink(sink);
                }
            }
            runs.push(run);
        }

        supervise(runs, sweep).await
    }
}

/// Drives every rank to completion. The first failure trips the shared
/// cancellation token, so samplers on the blocking pool stop at their next
/// batch, and then aborts the remaining tasks.
pub(crate) async fn supervise<C>(
    runs: Vec<EstimationRun<C>>,
    sweep: &Sweep,
) -> Result<Vec<AggregateResult>>
where
    C: Collective + 'static,
{
    let cancel = CancellationToken::new();
    // Also trips if this future is dropped mid-run.
    let guard = cancel.clone().drop_guard();

    let mut tasks = JoinSet::new();
    for run in runs {
        let rank = run.rank();
        let coordinator = run.is_coordinator();
        let run = run.with_cancellation(cancel.clone());
        let sweep = sweep.clone();
        tasks.spawn(async move { (rank, coordinator, run.run(&sweep).await) });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, coordinator, Ok(rows))) => {
                if coordinator {
                    results = rows;
                }
            }
            Ok((rank, _, Err(e))) => {
                error!(rank, error = %e, "worker failed, aborting run");
                cancel.cancel();
                tasks.abort_all();
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "worker task did not finish, aborting run");
                cancel.cancel();
                tasks.abort_all();
                return Err(Error::Join(e));
            }
        }
    }

    guard.disarm();
    Ok(results)
}
