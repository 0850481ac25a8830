//! Monte Carlo estimation of π across a group of cooperating workers.
//!
//! A sample budget is split as evenly as possible across the group, every
//! worker classifies its own points against the unit circle, and the
//! per-worker counts are summed at rank 0, which derives the estimate, its
//! error and the wall time of the whole cycle.

pub mod collective;
pub mod config;
pub mod error;
pub mod experiment;
pub mod group;
pub mod logging;
pub mod partition;
pub mod point;
pub mod run;
pub mod sampler;
pub mod seed;
pub mod sink;
pub mod sweep;

pub use collective::{reduce, Collective, LocalCollective, COORDINATOR};
pub use config::RunOptions;
pub use error::{Error, Result};
pub use group::WorkerGroup;
pub use partition::{partition, share_of};
pub use point::{Point, PointSource, UniformPoints};
pub use run::{AggregateResult, EstimationRun};
pub use sampler::sample;
pub use seed::{derive_seed, SeedPolicy};
pub use sink::{CsvSink, ResultRecord, ResultSink};
pub use sweep::Sweep;
