//! Frame events and per-frame measurement records.
//!
//! A [`FrameEvent`] is the push-interface input from the media pipeline: one
//! event per received video frame, carrying a monotonic arrival instant, a
//! 1-based strictly increasing sequence number, and the payload size.
//!
//! A [`MeasurementRecord`] is the corresponding output row: the stall-aware
//! metrics derived from the event plus its wall-clock timestamp and offset
//! into the current phase. Records are immutable once appended and are never
//! reordered.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

use crate::run::phase::Phase;

/// One received video frame, as delivered by the frame event source.
#[derive(Debug, Clone, Copy)]
pub struct FrameEvent {
    /// Monotonic arrival instant
    pub arrival: Instant,
    /// 1-based ordinal frame index, strictly increasing per the source
    pub sequence: u64,
    /// Payload size in bytes
    pub byte_size: u64,
}

/// One row of the measurement log, derived from exactly one [`FrameEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    /// Wall-clock arrival time, epoch seconds with sub-second precision
    pub timestamp: f64,
    /// Frame sequence number
    pub frame_number: u64,
    /// Time since the previous frame, milliseconds (0.0 for the first frame)
    pub delta_ms: f64,
    /// Instantaneous frame rate derived from `delta_ms` (0.0 when undefined)
    pub fps: f64,
    /// Whether `delta_ms` exceeded the stall threshold
    pub is_stall: bool,
    /// Instantaneous bitrate derived from payload size and `delta_ms`
    pub bitrate_kbps: f64,
    /// Seconds since the start of the current phase
    pub elapsed_sec: f64,
    /// Phase the frame arrived in (not part of the CSV row; phase
    /// attribution on disk comes from the timeline artifact)
    pub phase: Phase,
}

/// Pairing of a monotonic instant with the wall clock, captured once at run
/// start.
///
/// Phase durations and inter-frame deltas are measured against the monotonic
/// clock so a wall-clock adjustment mid-run cannot distort them; the anchor
/// only translates monotonic instants into epoch timestamps for the log.
#[derive(Debug, Clone, Copy)]
pub struct ClockAnchor {
    mono: Instant,
    wall_epoch: f64,
}

impl ClockAnchor {
    /// Capture the current instant on both clocks.
    pub fn now() -> Self {
        let wall_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            mono: Instant::now(),
            wall_epoch,
        }
    }

    /// Build an anchor from explicit values.
    pub fn from_parts(mono: Instant, wall_epoch: f64) -> Self {
        Self { mono, wall_epoch }
    }

    /// Epoch seconds corresponding to a monotonic instant at or after the
    /// anchor.
    pub fn epoch_at(&self, at: Instant) -> f64 {
        self.wall_epoch + at.saturating_duration_since(self.mono).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn anchor_translates_monotonic_to_epoch() {
        let anchor = ClockAnchor::from_parts(Instant::now(), 1_733_456_789.0);
        tokio::time::advance(Duration::from_millis(1500)).await;
        let epoch = anchor.epoch_at(Instant::now());
        assert!((epoch - 1_733_456_790.5).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_saturates_for_earlier_instants() {
        let early = Instant::now();
        tokio::time::advance(Duration::from_secs(1)).await;
        let anchor = ClockAnchor::from_parts(Instant::now(), 100.0);
        assert_eq!(anchor.epoch_at(early), 100.0);
    }
}
