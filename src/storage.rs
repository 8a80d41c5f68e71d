//! Measurement log writers.
//!
//! The measurement log is the only shared artifact between the recorder and
//! downstream report tooling. The recorder appends through the [`RecordSink`]
//! trait; [`CsvSink`] is the production implementation and [`MemorySink`]
//! backs tests.
//!
//! The CSV sink buffers rows and flushes on a bounded interval so a record
//! append never performs a synchronous disk write on the frame path, while a
//! crash can only lose rows younger than the flush interval. A final flush
//! always happens at shutdown, before the run is sealed.

use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::error::Result;
use crate::metrics::event::MeasurementRecord;

/// CSV column header, fixed by the log format contract.
pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "frame_number",
    "delta_ms",
    "fps",
    "is_stall",
    "bitrate_kbps",
    "elapsed_sec",
];

/// Render a record as its CSV row fields.
///
/// `timestamp` keeps millisecond precision; the derived metrics are fixed to
/// two decimal places; `is_stall` serializes as `0`/`1`.
pub fn format_row(record: &MeasurementRecord) -> [String; 7] {
    [
        format!("{:.3}", record.timestamp),
        record.frame_number.to_string(),
        format!("{:.2}", record.delta_ms),
        format!("{:.2}", record.fps),
        if record.is_stall { "1" } else { "0" }.to_string(),
        format!("{:.2}", record.bitrate_kbps),
        format!("{:.2}", record.elapsed_sec),
    ]
}

/// Append-only destination for measurement records.
#[async_trait]
pub trait RecordSink: Send {
    /// Append one record. Must not block the frame path; durable flushing
    /// may be deferred to a bounded interval.
    async fn append(&mut self, record: &MeasurementRecord) -> Result<()>;

    /// Force buffered records to durable storage.
    async fn flush(&mut self) -> Result<()>;

    /// Flush and release the sink. Called exactly once, at run seal.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Buffered CSV writer for the measurement log.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    flush_interval: Duration,
    last_flush: Instant,
}

impl CsvSink {
    /// Create the log file, write the header, and return the sink.
    pub fn create(path: impl AsRef<Path>, flush_interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;

        info!(path = %path.display(), "Measurement log initialized");

        Ok(Self {
            path,
            writer: Some(writer),
            flush_interval,
            last_flush: Instant::now(),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn append(&mut self, record: &MeasurementRecord) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(format_row(record))?;

            if self.last_flush.elapsed() >= self.flush_interval {
                writer.flush()?;
                self.last_flush = Instant::now();
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            self.last_flush = Instant::now();
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            info!(path = %self.path.display(), "Measurement log flushed and closed");
        }
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Appended records, in arrival order
    pub rows: Vec<MeasurementRecord>,
    /// Number of explicit flushes observed
    pub flushes: usize,
    /// Whether [`RecordSink::shutdown`] has run
    pub closed: bool,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.rows.push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.flushes += 1;
        self.closed = true;
        Ok(())
    }
}
