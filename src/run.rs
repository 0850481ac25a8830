//! One worker's pass over the sweep.
//!
//! Every rank runs the same loop: take its share of the configuration, sample
//! it on the blocking pool, and join the reduction. Rank 0 also turns the
//! total into an estimate and records it.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::collective::Collective;
use crate::config::RunOptions;
use crate::error::{Error, Result};
use crate::partition::share_of;
use crate::point::UniformPoints;
use crate::sampler::sample;
use crate::seed::derive_seed;
use crate::sink::{ResultRecord, ResultSink};
use crate::sweep::Sweep;

/// Coordinator-side outcome for one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
    pub sample_count: u64,
    pub worker_count: usize,
    pub inside: u64,
    pub pi_estimate: f64,
    pub absolute_error: f64,
    pub elapsed: Duration,
}

impl AggregateResult {
    pub fn new(sample_count: u64, worker_count: usize, inside: u64, elapsed: Duration) -> Self {
        let pi_estimate = 4.0 * inside as f64 / sample_count as f64;
        AggregateResult {
            sample_count,
            worker_count,
            inside,
            pi_estimate,
            absolute_error: (pi_estimate - PI).abs(),
            elapsed,
        }
    }

    pub fn record(&self) -> ResultRecord {
        ResultRecord {
            sample_count: self.sample_count,
            elapsed_seconds: self.elapsed.as_secs_f64(),
            worker_count: self.worker_count,
            pi_estimate: self.pi_estimate,
            absolute_error: self.absolute_error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Partitioned,
    Sampled,
    Reduced,
    Reported,
}

pub struct EstimationRun<C> {
    collective: C,
    options: RunOptions,
    seed_base: u64,
    sink: Option<Box<dyn ResultSink>>,
    cancel: CancellationToken,
    phase: Phase,
}

impl<C: Collective> EstimationRun<C> {
    /// `seed_base` must be the same on every rank of a run.
    pub fn new(collective: C, options: RunOptions, seed_base: u64) -> Self {
        EstimationRun {
            collective,
            options,
            seed_base,
            sink: None,
            cancel: CancellationToken::new(),
            phase: Phase::Idle,
        }
    }

    /// Hands the result sink to this run. Only the coordinator writes.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Shares the group's abort signal; sampling stops at the next batch once
    /// it trips.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn rank(&self) -> usize {
        self.collective.rank()
    }

    pub fn is_coordinator(&self) -> bool {
        self.collective.is_coordinator()
    }

    fn advance(&mut self, next: Phase) {
        trace!(rank = self.collective.rank(), from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    /// Evaluates every configuration in order. Non-coordinators return an
    /// empty vector.
    pub async fn run(mut self, sweep: &Sweep) -> Result<Vec<AggregateResult>> {
        let rank = self.collective.rank();
        let workers = self.collective.size();
        let mut results = Vec::new();

        for (index, &total) in sweep.iter().enumerate() {
            let start = Instant::now();

            let share = share_of(total, workers, rank)?;
            self.advance(Phase::Partitioned);

            let seed = derive_seed(self.seed_base, rank, index);
            let scratch = self.options.scratch_points;
            let cancel = self.cancel.clone();
            let inside = task::spawn_blocking(move || {
                let mut source = UniformPoints::from_seed(seed);
                sample(rank, share, &mut source, scratch, &cancel)
            })
            .await
            .map_err(|_| Error::WorkerLost { rank })??;
            debug!(rank, total, share, inside, "sampled");
            self.advance(Phase::Sampled);

            let aggregate = self.collective.reduce_sum(inside).await?;
            self.advance(Phase::Reduced);

            if let Some(aggregate) = aggregate {
                let result = AggregateResult::new(total, workers, aggregate, start.elapsed());
                info!(
                    samples = total,
                    workers,
                    pi = result.pi_estimate,
                    error = result.absolute_error,
                    elapsed = ?result.elapsed,
                    "configuration complete"
                );
                if let Some(sink) = self.sink.as_mut() {
                    sink.append(&result.record())?;
                }
                results.push(result);
                self.advance(Phase::Reported);
            }

            self.advance(Phase::Idle);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::LocalCollective;

    #[test]
    fn estimate_from_known_tallies() {
        let result = AggregateResult::new(1000, 4, 196 + 198 + 202 + 200, Duration::ZERO);
        assert_eq!(result.inside, 796);
        assert!((result.pi_estimate - 3.184).abs() < 1e-12);
        assert!((result.absolute_error - 0.0424).abs() < 1e-4);
    }

    #[test]
    fn record_carries_seconds() {
        let result = AggregateResult::new(100, 2, 78, Duration::from_millis(1500));
        let record = result.record();
        assert_eq!(record.sample_count, 100);
        assert_eq!(record.worker_count, 2);
        assert!((record.elapsed_seconds - 1.5).abs() < 1e-12);
        assert!((record.pi_estimate - 3.12).abs() < 1e-12);
    }

    #[tokio::test]
    async fn single_worker_run_reports_every_configuration() {
        let member = LocalCollective::group(1).unwrap().pop().unwrap();
        let sweep = Sweep::new(vec![100, 1000, 10_000]).unwrap();
        let results = EstimationRun::new(member, RunOptions::default(), 5)
            .with_sink(Box::new(Vec::<ResultRecord>::new()))
            .run(&sweep)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for (result, expected) in results.iter().zip([100, 1000, 10_000]) {
            assert_eq!(result.sample_count, expected);
            assert_eq!(result.worker_count, 1);
            assert!(result.inside <= expected);
        }
    }
}
