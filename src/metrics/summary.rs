//! Run summary and jitter analysis.
//!
//! Aggregates a finished record sequence into the run summary artifact:
//! completion flag, abort reason, frame/stall totals, stall time, average
//! rates, inter-frame jitter statistics, and the longest stall events.

use serde::Serialize;

use crate::error::AbortReason;
use crate::metrics::event::MeasurementRecord;
use crate::metrics::recorder::RecorderStats;

/// Inter-frame arrival time statistics over one run, in milliseconds.
///
/// Computed over every delta except the first record's placeholder zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JitterStats {
    /// Arithmetic mean delta
    pub mean_ms: f64,
    /// Median delta
    pub median_ms: f64,
    /// Standard deviation of deltas
    pub stdev_ms: f64,
    /// Smallest delta
    pub min_ms: f64,
    /// Largest delta
    pub max_ms: f64,
    /// 95th percentile delta
    pub p95_ms: f64,
    /// 99th percentile delta
    pub p99_ms: f64,
}

/// One stall event, for the longest-stalls ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StallEvent {
    /// Frame that ended the freeze
    pub frame_number: u64,
    /// Offset into the phase the frame arrived in, seconds
    pub elapsed_sec: f64,
    /// Freeze duration, milliseconds
    pub duration_ms: f64,
}

/// Sealed-run summary, serialized as the run summary artifact.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_uid: String,
    /// Whether both phases completed
    pub completed: bool,
    /// Why the run aborted, if it did
    pub abort_reason: Option<AbortReason>,
    /// Total frames recorded
    pub total_frames: u64,
    /// Frames classified as stalls
    pub total_stalls: u64,
    /// Whether the source violated sequence ordering at least once
    pub suspect: bool,
    /// Sum of stall gap durations, milliseconds
    pub total_stall_ms: f64,
    /// Stall time as a fraction of observed stream time, percent
    pub stall_percent: f64,
    /// Mean frame rate over the observed stream time
    pub average_fps: f64,
    /// Mean bitrate over the observed stream time
    pub average_bitrate_kbps: f64,
    /// Inter-frame jitter statistics (absent for runs under two frames)
    pub jitter: Option<JitterStats>,
    /// Up to five longest stalls, descending by duration
    pub longest_stalls: Vec<StallEvent>,
}

impl RunSummary {
    /// Build a summary from a sealed record sequence.
    pub fn build(
        run_uid: &str,
        records: &[MeasurementRecord],
        stats: RecorderStats,
        completed: bool,
        abort_reason: Option<AbortReason>,
    ) -> Self {
        // Observed stream time and byte total come from the deltas, so a
        // truncated run summarizes only what was actually measured.
        let total_delta_ms: f64 = records.iter().map(|r| r.delta_ms).sum();
        let total_bits: f64 = records
            .iter()
            .filter(|r| r.delta_ms > 0.0)
            .map(|r| r.bitrate_kbps * r.delta_ms)
            .sum();
        let total_stall_ms: f64 = records
            .iter()
            .filter(|r| r.is_stall)
            .map(|r| r.delta_ms)
            .sum();

        let average_fps = if total_delta_ms > 0.0 {
            (records.len().saturating_sub(1)) as f64 * 1000.0 / total_delta_ms
        } else {
            0.0
        };
        let average_bitrate_kbps = if total_delta_ms > 0.0 {
            total_bits / total_delta_ms
        } else {
            0.0
        };
        let stall_percent = if total_delta_ms > 0.0 {
            total_stall_ms / total_delta_ms * 100.0
        } else {
            0.0
        };

        let mut longest: Vec<StallEvent> = records
            .iter()
            .filter(|r| r.is_stall)
            .map(|r| StallEvent {
                frame_number: r.frame_number,
                elapsed_sec: r.elapsed_sec,
                duration_ms: r.delta_ms,
            })
            .collect();
        longest.sort_by(|a, b| {
            b.duration_ms
                .partial_cmp(&a.duration_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        longest.truncate(5);

        Self {
            run_uid: run_uid.to_string(),
            completed,
            abort_reason,
            total_frames: stats.total_frames,
            total_stalls: stats.total_stalls,
            suspect: stats.suspect(),
            total_stall_ms,
            stall_percent,
            average_fps,
            average_bitrate_kbps,
            jitter: jitter_stats(records),
            longest_stalls: longest,
        }
    }
}

/// Compute jitter statistics over the inter-frame deltas.
fn jitter_stats(records: &[MeasurementRecord]) -> Option<JitterStats> {
    // Skip the first record: its zero delta is a placeholder, not a gap.
    let deltas: Vec<f64> = records.iter().skip(1).map(|r| r.delta_ms).collect();
    if deltas.is_empty() {
        return None;
    }

    let n = deltas.len() as f64;
    let mean = deltas.iter().sum::<f64>() / n;
    let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = deltas.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(JitterStats {
        mean_ms: mean,
        median_ms: percentile(&sorted, 50.0),
        stdev_ms: variance.sqrt(),
        min_ms: sorted[0],
        max_ms: sorted[sorted.len() - 1],
        p95_ms: percentile(&sorted, 95.0),
        p99_ms: percentile(&sorted, 99.0),
    })
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
