//! Stall-aware stream metrics.
//!
//! One [`event::FrameEvent`] in, one [`event::MeasurementRecord`] out: the
//! [`recorder::MetricsRecorder`] derives inter-frame delta, instantaneous
//! FPS, stall classification, and bitrate per frame, and
//! [`summary::RunSummary`] aggregates a sealed record sequence.

pub mod event;
pub mod recorder;
pub mod summary;

pub use event::{ClockAnchor, FrameEvent, MeasurementRecord};
pub use recorder::{MetricsRecorder, RecorderReport, RecorderStats};
pub use summary::{JitterStats, RunSummary, StallEvent};
