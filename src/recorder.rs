//! Trajectory output sinks
//!
//! A run hands its recorder the species names once and then a
//! time-ordered stream of samples. [`CsvRecorder`] persists them as one
//! header row plus one row per sample; [`MemoryRecorder`] keeps them in
//! memory for library use and tests.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::RecorderError;

/// Receiver of the species header and the sampled trajectory
pub trait Recorder<const N: usize> {
    /// Called once before any sample with the ordered species names
    fn begin(&mut self, names: &[&str]) -> Result<(), RecorderError>;

    /// Called for every sample, in strictly increasing time order
    fn record(&mut self, t: f64, x: &[f64; N]) -> Result<(), RecorderError>;

    /// Called once after the last sample of a successful run
    fn finish(&mut self) -> Result<(), RecorderError> {
        Ok(())
    }
}

/// Comma-separated trajectory writer
///
/// Numbers are written in their shortest round-trip form, so reading the
/// file back reproduces the integrator's values bit for bit. The underlying
/// `csv::Writer` flushes on drop, which releases partial output when a run
/// aborts.
pub struct CsvRecorder<W: Write> {
    writer: csv::Writer<W>,
    row: Vec<String>,
}

impl CsvRecorder<BufWriter<File>> {
    /// Create (or truncate) the output file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RecorderError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> CsvRecorder<W> {
    /// Write CSV to an arbitrary stream
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(false).from_writer(inner),
            row: Vec::new(),
        }
    }

    /// Flush and return the underlying stream
    pub fn into_inner(self) -> Result<W, RecorderError> {
        self.writer
            .into_inner()
            .map_err(|e| RecorderError::Io(e.into_error()))
    }
}

impl<W: Write, const N: usize> Recorder<N> for CsvRecorder<W> {
    fn begin(&mut self, names: &[&str]) -> Result<(), RecorderError> {
        self.writer
            .write_record(std::iter::once("t").chain(names.iter().copied()))?;
        Ok(())
    }

    fn record(&mut self, t: f64, x: &[f64; N]) -> Result<(), RecorderError> {
        self.row.clear();
        self.row.push(format!("{t:?}"));
        self.row.extend(x.iter().map(|v| format!("{v:?}")));
        self.writer.write_record(&self.row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory trajectory
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder<const N: usize> {
    /// Header passed to [`Recorder::begin`]
    pub names: Vec<String>,
    /// Sample times
    pub times: Vec<f64>,
    /// Sampled states, parallel to `times`
    pub states: Vec<[f64; N]>,
    /// Whether [`Recorder::finish`] was called
    pub finished: bool,
}

impl<const N: usize> MemoryRecorder<N> {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples recorded
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if no sample was recorded
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Last sample, if any
    pub fn last(&self) -> Option<(f64, &[f64; N])> {
        self.times.last().copied().zip(self.states.last())
    }
}

impl<const N: usize> Recorder<N> for MemoryRecorder<N> {
    fn begin(&mut self, names: &[&str]) -> Result<(), RecorderError> {
        self.names = names.iter().map(|s| s.to_string()).collect();
        Ok(())
    }

    fn record(&mut self, t: f64, x: &[f64; N]) -> Result<(), RecorderError> {
        self.times.push(t);
        self.states.push(*x);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        self.finished = true;
        Ok(())
    }
}
