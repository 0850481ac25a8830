//! Splitting a sample budget across workers.
//!
//! The remainder of `total / workers` goes one sample at a time to the
//! lowest ranks, so no two shares ever differ by more than one.

use crate::error::{Error, Result};

/// Shares for every rank, indexed by rank.
pub fn partition(total: u64, workers: usize) -> Result<Vec<u64>> {
    if workers == 0 {
        return Err(Error::invalid("worker count must be at least 1"));
    }
    Ok((0..workers).map(|rank| split(total, workers, rank)).collect())
}

/// The share owed to a single rank, without building the whole vector.
pub fn share_of(total: u64, workers: usize, rank: usize) -> Result<u64> {
    if workers == 0 {
        return Err(Error::invalid("worker count must be at least 1"));
    }
    if rank >= workers {
        return Err(Error::invalid(format!(
            "rank {rank} is outside a group of {workers} workers"
        )));
    }
    Ok(split(total, workers, rank))
}

fn split(total: u64, workers: usize, rank: usize) -> u64 {
    let workers = workers as u64;
    let samples_per_worker = total / workers;
    let remainder = total % workers;

    if (rank as u64) < remainder {
        samples_per_worker + 1
    } else {
        samples_per_worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn even_split() {
        assert_eq!(partition(1000, 4).unwrap(), vec![250, 250, 250, 250]);
    }

    #[test]
    fn remainder_goes_to_lowest_ranks() {
        assert_eq!(partition(7, 3).unwrap(), vec![3, 2, 2]);
        assert_eq!(partition(11, 4).unwrap(), vec![3, 3, 3, 2]);
    }

    #[test]
    fn more_workers_than_samples() {
        assert_eq!(partition(2, 5).unwrap(), vec![1, 1, 0, 0, 0]);
        assert_eq!(partition(0, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            partition(100, 0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            share_of(100, 0, 0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rank_out_of_range_is_rejected() {
        assert!(matches!(
            share_of(100, 4, 4),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn share_of_agrees_with_partition() {
        let shares = partition(1_000_003, 6).unwrap();
        for (rank, share) in shares.iter().enumerate() {
            assert_eq!(share_of(1_000_003, 6, rank).unwrap(), *share);
        }
    }

    proptest! {
        #[test]
        fn shares_sum_to_total(total in 0u64..10_000_000, workers in 1usize..128) {
            let shares = partition(total, workers).unwrap();
            prop_assert_eq!(shares.len(), workers);
            prop_assert_eq!(shares.iter().sum::<u64>(), total);
        }

        #[test]
        fn skew_is_at_most_one(total in 0u64..10_000_000, workers in 1usize..128) {
            let shares = partition(total, workers).unwrap();
            let max = *shares.iter().max().unwrap();
            let min = *shares.iter().min().unwrap();
            prop_assert!(max - min <= 1, "max={max} min={min}");
        }

        #[test]
        fn shares_are_non_increasing(total in 0u64..1_000_000, workers in 1usize..64) {
            let shares = partition(total, workers).unwrap();
            prop_assert!(shares.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
