//! Where coordinator results end up.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const RESULT_HEADER: &str = "samples,elapsed_seconds,workers,pi_estimate,absolute_error";

/// One row per evaluated configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    pub sample_count: u64,
    pub elapsed_seconds: f64,
    pub worker_count: usize,
    pub pi_estimate: f64,
    pub absolute_error: f64,
}

impl ResultRecord {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.15},{},{:.15},{:.15}",
            self.sample_count,
            self.elapsed_seconds,
            self.worker_count,
            self.pi_estimate,
            self.absolute_error
        )
    }
}

pub trait ResultSink: Send {
    fn append(&mut self, record: &ResultRecord) -> Result<()>;
}

impl ResultSink for Vec<ResultRecord> {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.push(*record);
        Ok(())
    }
}

/// Append-only CSV file. The header goes in only when the file starts out
/// empty, so repeated runs accumulate rows under a single header.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| Error::SinkUnavailable {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(unavailable)?;
        let fresh = file.metadata().map_err(unavailable)?.len() == 0;

        let mut sink = CsvSink {
            writer: BufWriter::new(file),
            path,
        };
        if fresh {
            sink.write_line(RESULT_HEADER)?;
        }
        Ok(sink)
    }

    // Flushed per line so rows from finished configurations survive an abort.
    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| Error::SinkUnavailable {
                path: self.path.clone(),
                source,
            })
    }
}

impl ResultSink for CsvSink {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.write_line(&record.to_csv_row())
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush result sink");
        }
    }
}
