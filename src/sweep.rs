use std::ops::Deref;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Powers of ten from 10² to 10⁹.
pub const DEFAULT_SWEEP: [u64; 8] = [
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

/// Ordered sample counts to evaluate, each strictly positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep(Vec<u64>);

impl Sweep {
    pub fn new(counts: Vec<u64>) -> Result<Self> {
        if counts.is_empty() {
            return Err(Error::invalid("sweep must contain at least one sample count"));
        }
        if let Some(pos) = counts.iter().position(|&n| n == 0) {
            return Err(Error::invalid(format!(
                "sample count at position {pos} is zero"
            )));
        }
        Ok(Sweep(counts))
    }
}

impl Default for Sweep {
    fn default() -> Self {
        Sweep(DEFAULT_SWEEP.to_vec())
    }
}

impl Deref for Sweep {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

/// Comma-separated counts; `_` separators are allowed (`1_000,10_000`).
impl FromStr for Sweep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let counts = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.replace('_', "")
                    .parse::<u64>()
                    .map_err(|e| Error::invalid(format!("bad sample count '{part}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Sweep::new(counts)
    }
}
