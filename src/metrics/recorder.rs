//! Stall-aware metrics recorder.
//!
//! Consumes one [`FrameEvent`] per received frame, in arrival order, and
//! produces one [`MeasurementRecord`] per event:
//!
//! - `delta_ms` is the monotonic gap to the previous frame (0.0 for the
//!   first frame of the run);
//! - `fps` and `bitrate_kbps` derive from `delta_ms`, with a divide-by-zero
//!   guard for duplicate-instant arrivals (both become 0.0);
//! - `is_stall` is `delta_ms > stall_threshold_ms`, strictly;
//! - `elapsed_sec` is the offset into the current phase, and resets when the
//!   orchestrator opens a new phase.
//!
//! A frame whose sequence number is not strictly greater than its
//! predecessor's is a protocol violation by the source: the recorder flags
//! the run as suspect but still records the event with best-effort fields,
//! since dropping it would corrupt the frame count used for loss analysis.
//!
//! The recorder exclusively owns appends to the measurement log. Appends go
//! through a buffered [`RecordSink`] so the frame path never blocks on a
//! synchronous disk write.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics::event::{ClockAnchor, FrameEvent, MeasurementRecord};
use crate::run::phase::Phase;
use crate::storage::RecordSink;

/// Frames between periodic progress log lines.
const PROGRESS_LOG_EVERY: u64 = 30;

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Total frames recorded
    pub total_frames: u64,
    /// Frames classified as stalls
    pub total_stalls: u64,
    /// Frames whose sequence number failed to increase
    pub sequence_anomalies: u64,
}

impl RecorderStats {
    /// Whether any protocol violation was observed from the source.
    pub fn suspect(&self) -> bool {
        self.sequence_anomalies > 0
    }
}

/// Recorder output, produced once when the run seals.
pub struct RecorderReport {
    /// All records, in arrival order
    pub records: Vec<MeasurementRecord>,
    /// Run counters
    pub stats: RecorderStats,
}

struct PrevFrame {
    arrival: Instant,
    sequence: u64,
}

/// Stall-aware per-frame metrics recorder.
pub struct MetricsRecorder {
    stall_threshold_ms: f64,
    anchor: ClockAnchor,
    sink: Box<dyn RecordSink>,
    prev: Option<PrevFrame>,
    phase: Phase,
    phase_start: Instant,
    records: Vec<MeasurementRecord>,
    stats: RecorderStats,
}

impl MetricsRecorder {
    /// Create a recorder. `phase_start` is the Baseline start instant; the
    /// orchestrator resets the phase clock via [`begin_phase`] at the
    /// Baseline->Attack transition.
    ///
    /// [`begin_phase`]: MetricsRecorder::begin_phase
    pub fn new(
        stall_threshold_ms: f64,
        anchor: ClockAnchor,
        phase_start: Instant,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            stall_threshold_ms,
            anchor,
            sink,
            prev: None,
            phase: Phase::Baseline,
            phase_start,
            records: Vec::new(),
            stats: RecorderStats::default(),
        }
    }

    /// Reset the phase clock. Called exactly once per phase transition,
    /// before any frame of the new phase is processed.
    pub fn begin_phase(&mut self, phase: Phase, start: Instant) {
        debug!(phase = %phase, "Phase clock reset");
        self.phase = phase;
        self.phase_start = start;
    }

    /// Record one frame event and append the resulting record to the log.
    pub async fn record(&mut self, event: &FrameEvent) -> Result<MeasurementRecord> {
        if let Some(prev) = &self.prev {
            if event.sequence <= prev.sequence {
                self.stats.sequence_anomalies += 1;
                warn!(
                    sequence = event.sequence,
                    previous = prev.sequence,
                    "Out-of-order frame sequence; recording anyway, run flagged suspect"
                );
            }
        }

        let delta_ms = match &self.prev {
            Some(prev) => {
                // Via integer nanoseconds so a gap of exactly the threshold
                // compares exactly (as_secs_f64 * 1000.0 rounds 100ms up).
                event
                    .arrival
                    .saturating_duration_since(prev.arrival)
                    .as_nanos() as f64
                    / 1e6
            }
            None => 0.0,
        };

        let fps = if delta_ms > 0.0 { 1000.0 / delta_ms } else { 0.0 };
        let bitrate_kbps = if delta_ms > 0.0 {
            // (bytes * 8 / 1000) kbit over (delta_ms / 1000) seconds
            (event.byte_size as f64) * 8.0 / delta_ms
        } else {
            0.0
        };
        let is_stall = delta_ms > self.stall_threshold_ms;

        let record = MeasurementRecord {
            timestamp: self.anchor.epoch_at(event.arrival),
            frame_number: event.sequence,
            delta_ms,
            fps,
            is_stall,
            bitrate_kbps,
            elapsed_sec: event
                .arrival
                .saturating_duration_since(self.phase_start)
                .as_secs_f64(),
            phase: self.phase,
        };

        self.stats.total_frames += 1;
        if is_stall {
            self.stats.total_stalls += 1;
            warn!(
                delta_ms = format_args!("{:.1}", delta_ms),
                frame = event.sequence,
                phase = %self.phase,
                "Stall detected"
            );
        }

        if self.stats.total_frames % PROGRESS_LOG_EVERY == 0 {
            info!(
                frame = event.sequence,
                fps = format_args!("{:.1}", fps),
                bitrate_kbps = format_args!("{:.0}", bitrate_kbps),
                stalls = self.stats.total_stalls,
                phase = %self.phase,
                "Stream progress"
            );
        }

        self.sink.append(&record).await?;
        self.records.push(record.clone());
        self.prev = Some(PrevFrame {
            arrival: event.arrival,
            sequence: event.sequence,
        });

        Ok(record)
    }

    /// Counters so far.
    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    /// Flush the log without sealing; used on abort paths before teardown.
    pub async fn flush(&mut self) -> Result<()> {
        self.sink.flush().await
    }

    /// Flush and close the log, consuming the recorder.
    pub async fn finish(mut self) -> Result<RecorderReport> {
        self.sink.shutdown().await?;
        Ok(RecorderReport {
            records: self.records,
            stats: self.stats,
        })
    }
}
