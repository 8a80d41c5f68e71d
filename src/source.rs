//! Synthetic frame event source.
//!
//! Stands in for the external media pipeline during in-process runs and
//! tests: emits [`FrameEvent`]s on a steady frame cadence, with optional
//! arrival jitter and scripted stall gaps. Ending the configured frame count
//! (or dropping the receiver) closes the channel, which the orchestrator
//! observes as end-of-stream.
//!
//! Capability knobs that were ambient process state in older capture tooling
//! (frame size, cadence) are explicit configuration here, so orchestration
//! logic stays independent of encoder capability.

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use crate::metrics::event::FrameEvent;

/// Synthetic source configuration.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    /// Nominal frame rate
    pub fps: f64,
    /// Payload size per frame, bytes
    pub frame_bytes: u64,
    /// Uniform arrival jitter applied per frame, +/- milliseconds
    pub jitter_ms: f64,
    /// Scripted extra gaps: (sequence, extra delay in ms) injected before
    /// that frame is emitted
    pub stall_gaps: Vec<(u64, u64)>,
    /// Total frames to emit (`None` = until the receiver is dropped)
    pub max_frames: Option<u64>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            fps: 30.0,
            // ~4.5 Mbps at 30 fps
            frame_bytes: 18_750,
            jitter_ms: 0.0,
            stall_gaps: Vec::new(),
            max_frames: None,
        }
    }
}

impl SyntheticSource {
    /// Source with a steady cadence at `fps`.
    pub fn steady(fps: f64) -> Self {
        Self {
            fps,
            ..Default::default()
        }
    }

    /// Add a scripted stall before the given frame.
    pub fn with_stall(mut self, sequence: u64, extra_ms: u64) -> Self {
        self.stall_gaps.push((sequence, extra_ms));
        self
    }

    /// Add uniform arrival jitter.
    pub fn with_jitter(mut self, jitter_ms: f64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Limit the number of emitted frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Spawn the emitter task. It runs until `max_frames` is reached or the
    /// receiver side is dropped.
    pub fn spawn(self, tx: mpsc::Sender<FrameEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period_ms = 1000.0 / self.fps;
            let mut sequence: u64 = 0;

            info!(
                fps = self.fps,
                frame_bytes = self.frame_bytes,
                max_frames = ?self.max_frames,
                "Synthetic frame source started"
            );

            loop {
                sequence += 1;
                if let Some(max) = self.max_frames {
                    if sequence > max {
                        break;
                    }
                }

                let jitter = if self.jitter_ms > 0.0 {
                    rand::thread_rng().gen_range(-self.jitter_ms..=self.jitter_ms)
                } else {
                    0.0
                };
                let extra: u64 = self
                    .stall_gaps
                    .iter()
                    .filter(|(seq, _)| *seq == sequence)
                    .map(|(_, ms)| *ms)
                    .sum();

                let delay_ms = (period_ms + jitter).max(0.0) + extra as f64;
                sleep(Duration::from_secs_f64(delay_ms / 1000.0)).await;

                let event = FrameEvent {
                    arrival: Instant::now(),
                    sequence,
                    byte_size: self.frame_bytes,
                };
                if tx.send(event).await.is_err() {
                    debug!(sequence, "Frame receiver dropped; source stopping");
                    return;
                }
            }

            debug!(frames = sequence - 1, "Synthetic frame source drained");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_the_configured_number_of_frames() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = SyntheticSource::steady(30.0).with_max_frames(5).spawn(tx);

        let mut sequences = Vec::new();
        while let Some(event) = rx.recv().await {
            sequences.push(event.sequence);
        }
        handle.await.expect("source task");

        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_stall_delays_the_target_frame() {
        let (tx, mut rx) = mpsc::channel(64);
        let handle = SyntheticSource::steady(100.0)
            .with_max_frames(3)
            .with_stall(3, 300)
            .spawn(tx);

        let first = rx.recv().await.expect("frame 1");
        let second = rx.recv().await.expect("frame 2");
        let third = rx.recv().await.expect("frame 3");
        handle.await.expect("source task");

        let normal_gap = second.arrival.duration_since(first.arrival);
        let stalled_gap = third.arrival.duration_since(second.arrival);
        assert!(normal_gap < Duration::from_millis(50));
        assert!(stalled_gap >= Duration::from_millis(300));
    }
}
