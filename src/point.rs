use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A sample drawn from the square [-1, 1]².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Points on the circle itself count as inside.
    #[inline]
    pub fn is_inside(&self) -> bool {
        self.x * self.x + self.y * self.y <= 1.0
    }
}

/// Anything that can hand out sample points one at a time.
pub trait PointSource {
    fn next_point(&mut self) -> Point;

    /// A lazy stream of exactly `count` points.
    fn points(&mut self, count: u64) -> Points<'_, Self>
    where
        Self: Sized,
    {
        Points {
            source: self,
            remaining: count,
        }
    }
}

pub struct Points<'a, S> {
    source: &'a mut S,
    remaining: u64,
}

impl<S: PointSource> Iterator for Points<'_, S> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.source.next_point())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, usize::try_from(self.remaining).ok())
    }
}

/// Uniform points backed by a seeded `StdRng`.
pub struct UniformPoints {
    rng: StdRng,
}

impl UniformPoints {
    pub fn from_seed(seed: u64) -> Self {
        UniformPoints {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    fn coordinate(&mut self) -> f64 {
        self.rng.gen::<f64>() * 2.0 - 1.0
    }
}

impl PointSource for UniformPoints {
    #[inline]
    fn next_point(&mut self) -> Point {
        let x = self.coordinate();
        let y = self.coordinate();
        Point { x, y }
    }
}
