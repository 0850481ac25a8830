use crate::error::{Error, Result};
use crate::sampler::DEFAULT_SCRATCH_POINTS;
use crate::seed::SeedPolicy;

/// Validated settings shared by every rank of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub workers: usize,
    pub seed: SeedPolicy,
    pub scratch_points: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            workers: 1,
            seed: SeedPolicy::Clock,
            scratch_points: DEFAULT_SCRATCH_POINTS,
        }
    }
}

impl RunOptions {
    pub fn new(workers: usize) -> Self {
        RunOptions {
            workers,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_scratch_points(mut self, scratch_points: usize) -> Self {
        self.scratch_points = scratch_points;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid("worker count must be at least 1"));
        }
        if self.scratch_points == 0 {
            return Err(Error::invalid("scratch buffer must hold at least one point"));
        }
        Ok(())
    }
}

/// Worker count when none is given: one per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
