//! Per-worker sampling loop.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::point::{Point, PointSource};

/// Default number of points staged in memory at once.
pub const DEFAULT_SCRATCH_POINTS: usize = 1 << 16;

/// Draws exactly `assignment` points from `source` and returns how many fell
/// inside the unit circle.
///
/// Points are staged in a scratch buffer of at most `scratch_limit` entries,
/// reserved up front and released before returning. A failed reservation is
/// reported as [`Error::AllocationFailure`] for `rank`.
///
/// `cancel` is checked before every batch; once it trips the worker stops
/// drawing and reports itself lost.
pub fn sample<S: PointSource>(
    rank: usize,
    assignment: u64,
    source: &mut S,
    scratch_limit: usize,
    cancel: &CancellationToken,
) -> Result<u64> {
    if assignment == 0 {
        return Ok(0);
    }
    if scratch_limit == 0 {
        return Err(Error::invalid("scratch buffer must hold at least one point"));
    }

    let capacity = usize::try_from(assignment)
        .unwrap_or(usize::MAX)
        .min(scratch_limit);
    let mut scratch: Vec<Point> = Vec::new();
    scratch
        .try_reserve_exact(capacity)
        .map_err(|_| Error::AllocationFailure {
            rank,
            requested: capacity as u64,
        })?;

    let mut inside = 0u64;
    let mut remaining = assignment;
    while remaining > 0 {
        if cancel.is_cancelled() {
            return Err(Error::WorkerLost { rank });
        }
        let batch = remaining.min(capacity as u64);
        scratch.extend(source.points(batch));
        inside += scratch.iter().filter(|p| p.is_inside()).count() as u64;
        scratch.clear();
        remaining -= batch;
    }

    Ok(inside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::UniformPoints;

    /// Replays a fixed cycle of points and counts how many were drawn.
    struct Scripted {
        points: Vec<Point>,
        drawn: usize,
    }

    impl Scripted {
        fn new(points: Vec<Point>) -> Self {
            Scripted { points, drawn: 0 }
        }
    }

    fn live() -> CancellationToken {
        CancellationToken::new()
    }

    impl PointSource for Scripted {
        fn next_point(&mut self) -> Point {
            let p = self.points[self.drawn % self.points.len()];
            self.drawn += 1;
            p
        }
    }

    #[test]
    fn zero_assignment_draws_nothing() {
        let mut source = Scripted::new(vec![Point::new(0.0, 0.0)]);
        assert_eq!(sample(0, 0, &mut source, 16, &live()).unwrap(), 0);
        assert_eq!(source.drawn, 0);
    }

    #[test]
    fn counts_inside_points() {
        let mut source = Scripted::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(-0.9, 0.9),
        ]);
        assert_eq!(sample(0, 4, &mut source, 16, &live()).unwrap(), 2);
        assert_eq!(source.drawn, 4);
    }

    #[test]
    fn draws_exactly_assignment_across_batches() {
        let mut source = Scripted::new(vec![Point::new(0.5, 0.5), Point::new(0.9, 0.9)]);
        // 10 points through a 3-point scratch: 3 + 3 + 3 + 1.
        let inside = sample(2, 10, &mut source, 3, &live()).unwrap();
        assert_eq!(source.drawn, 10);
        assert_eq!(inside, 5);
    }

    #[test]
    fn tally_never_exceeds_assignment() {
        let mut source = UniformPoints::from_seed(11);
        let inside = sample(0, 5_000, &mut source, 512, &live()).unwrap();
        assert!(inside <= 5_000);
    }

    #[test]
    fn estimate_converges() {
        let mut source = UniformPoints::from_seed(31337);
        let n = 1_000_000u64;
        let inside = sample(0, n, &mut source, DEFAULT_SCRATCH_POINTS, &live()).unwrap();
        let pi = 4.0 * inside as f64 / n as f64;
        assert!((pi - std::f64::consts::PI).abs() < 0.01, "pi={pi}");
    }

    #[test]
    fn unreservable_scratch_is_an_allocation_failure() {
        let mut source = Scripted::new(vec![Point::new(0.0, 0.0)]);
        let err = sample(3, u64::MAX, &mut source, usize::MAX, &live()).unwrap_err();
        assert!(matches!(err, Error::AllocationFailure { rank: 3, .. }));
        assert_eq!(source.drawn, 0);
    }

    #[test]
    fn cancelled_worker_stops_drawing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut source = Scripted::new(vec![Point::new(0.0, 0.0)]);
        let err = sample(1, 10, &mut source, 3, &cancel).unwrap_err();
        assert!(matches!(err, Error::WorkerLost { rank: 1 }));
        assert_eq!(source.drawn, 0);
    }

    /// Trips the token after a fixed number of draws.
    struct Tripwire {
        inner: Scripted,
        after: usize,
        cancel: CancellationToken,
    }

    impl PointSource for Tripwire {
        fn next_point(&mut self) -> Point {
            if self.inner.drawn + 1 == self.after {
                self.cancel.cancel();
            }
            self.inner.next_point()
        }
    }

    #[test]
    fn cancellation_mid_share_stops_at_next_batch() {
        let cancel = CancellationToken::new();
        let mut source = Tripwire {
            inner: Scripted::new(vec![Point::new(0.0, 0.0)]),
            after: 5,
            cancel: cancel.clone(),
        };
        // Batches of 4: the token trips during the second batch.
        let err = sample(0, 1_000_000, &mut source, 4, &cancel).unwrap_err();
        assert!(matches!(err, Error::WorkerLost { rank: 0 }));
        assert_eq!(source.inner.drawn, 8);
    }

    #[test]
    fn zero_scratch_is_rejected() {
        let mut source = Scripted::new(vec![Point::new(0.0, 0.0)]);
        assert!(matches!(
            sample(0, 10, &mut source, 0, &live()),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
