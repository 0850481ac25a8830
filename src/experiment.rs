//! Scaling experiments: repeat the sweep for every worker count, then reduce
//! the raw rows to one averaged row per (workers, samples) with speedup
//! against the single-worker time.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::RunOptions;
use crate::error::{Error, Result};
use crate::group::WorkerGroup;
use crate::sink::{CsvSink, ResultRecord, RESULT_HEADER};
use crate::sweep::Sweep;

pub const DEFAULT_REPETITIONS: usize = 25;

pub const SUMMARY_HEADER: &str =
    "samples,workers,elapsed_seconds,speedup,pi_estimate,absolute_error";

/// Averaged outcome for one (workers, samples) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub sample_count: u64,
    pub worker_count: usize,
    pub elapsed_seconds: f64,
    pub speedup: f64,
    pub pi_estimate: f64,
    pub absolute_error: f64,
}

impl SummaryRow {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{:.15},{:.15},{:.15},{:.15}",
            self.sample_count,
            self.worker_count,
            self.elapsed_seconds,
            self.speedup,
            self.pi_estimate,
            self.absolute_error
        )
    }
}

pub struct Experiment {
    pub max_workers: usize,
    pub repetitions: usize,
    pub sweep: Sweep,
    pub base: RunOptions,
    pub raw_output: PathBuf,
}

impl Experiment {
    /// Runs the sweep `repetitions` times for each worker count in
    /// `1..=max_workers`, appending every row to the raw file, and returns the
    /// rows read back from it.
    pub async fn run(&self) -> Result<Vec<ResultRecord>> {
        if self.max_workers == 0 || self.repetitions == 0 {
            return Err(Error::invalid(
                "experiments need at least one worker count and one repetition",
            ));
        }

        for workers in 1..=self.max_workers {
            let group = WorkerGroup::new(RunOptions {
                workers,
                ..self.base
            })?;
            info!(workers, repetitions = self.repetitions, "experiment configuration");
            for repetition in 0..self.repetitions {
                let sink = CsvSink::open(&self.raw_output)?;
                group.run(&self.sweep, Box::new(sink)).await?;
                info!(workers, repetition = repetition + 1, "repetition finished");
            }
        }

        read_records(&self.raw_output)
    }
}

/// Parses a raw results file. Header rows are skipped wherever they appear.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ResultRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line == RESULT_HEADER {
            continue;
        }
        records.push(parse_record(line).map_err(|message| Error::Parse {
            path: path.display().to_string(),
            line: index + 1,
            message,
        })?);
    }

    Ok(records)
}

fn parse_record(line: &str) -> std::result::Result<ResultRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    }
    fn field<T: std::str::FromStr>(raw: &str, name: &str) -> std::result::Result<T, String> {
        raw.parse().map_err(|_| format!("invalid {name} '{raw}'"))
    }
    Ok(ResultRecord {
        sample_count: field(fields[0], "sample count")?,
        elapsed_seconds: field(fields[1], "elapsed time")?,
        worker_count: field(fields[2], "worker count")?,
        pi_estimate: field(fields[3], "pi estimate")?,
        absolute_error: field(fields[4], "absolute error")?,
    })
}

/// Computes the `p`-th quantile on **pre-sorted** data (R-7 method, the
/// linear interpolation numpy uses by default).
///
/// The caller must guarantee that `sorted` is in non-decreasing order.
///
/// # Returns
/// - `None` if `sorted` is empty or `p` is outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
    }
}

/// Keeps records whose elapsed time lies within 1.5 IQR of the quartiles.
pub fn without_outliers(records: &[ResultRecord]) -> Vec<ResultRecord> {
    let mut times: Vec<f64> = records.iter().map(|r| r.elapsed_seconds).collect();
    times.sort_by(|a, b| a.total_cmp(b));

    let (Some(q1), Some(q3)) = (quantile_sorted(&times, 0.25), quantile_sorted(&times, 0.75))
    else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    records
        .iter()
        .filter(|r| (lo..=hi).contains(&r.elapsed_seconds))
        .copied()
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// One row per (workers, samples), sorted by workers then samples.
pub fn summarize(records: &[ResultRecord]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(usize, u64), Vec<ResultRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.worker_count, record.sample_count))
            .or_default()
            .push(*record);
    }

    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .filter_map(|((workers, samples), group)| {
            let kept = without_outliers(&group);
            if kept.is_empty() {
                warn!(workers, samples, "no rows left after outlier removal");
                return None;
            }
            Some(SummaryRow {
                sample_count: samples,
                worker_count: workers,
                elapsed_seconds: mean(kept.iter().map(|r| r.elapsed_seconds)),
                speedup: 0.0,
                pi_estimate: mean(kept.iter().map(|r| r.pi_estimate)),
                absolute_error: mean(kept.iter().map(|r| r.absolute_error)),
            })
        })
        .collect();

    let serial: HashMap<u64, f64> = rows
        .iter()
        .filter(|r| r.worker_count == 1)
        .map(|r| (r.sample_count, r.elapsed_seconds))
        .collect();
    for row in &mut rows {
        row.speedup = match serial.get(&row.sample_count) {
            Some(&t1) if row.elapsed_seconds > 0.0 => t1 / row.elapsed_seconds,
            _ => 0.0,
        };
    }

    rows
}

pub fn write_summary(path: impl AsRef<Path>, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{SUMMARY_HEADER}")?;
    for row in rows {
        writeln!(writer, "{}", row.to_csv_row())?;
    }
    writer.flush()?;
    Ok(())
}
