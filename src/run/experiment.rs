//! Experiment run ownership and sealing.
//!
//! An [`ExperimentRun`] owns exactly one phase timeline while the run is in
//! progress; the orchestrator is the only writer. Sealing consumes it
//! together with the recorder's report and produces an immutable
//! [`SealedRun`], which carries everything downstream report tooling needs:
//! the ordered records, the phase timeline, and the completion verdict.

use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::{AbortReason, Result};
use crate::metrics::recorder::RecorderReport;
use crate::metrics::summary::RunSummary;
use crate::metrics::MeasurementRecord;
use crate::run::phase::{Phase, PhaseTimeline};

/// In-progress run state, owned by the orchestrator.
#[derive(Debug)]
pub struct ExperimentRun {
    /// Unique run identifier
    pub run_uid: String,
    /// Phase timeline, written only at transitions
    pub timeline: PhaseTimeline,
}

impl ExperimentRun {
    /// Create a run with a fresh identifier and an empty timeline.
    pub fn new() -> Self {
        Self {
            run_uid: Uuid::new_v4().to_string(),
            timeline: PhaseTimeline::new(),
        }
    }

    /// Open a phase span at `epoch` seconds.
    pub fn open_phase(&mut self, phase: Phase, epoch: f64) {
        self.timeline.open(phase, epoch);
    }

    /// Seal the run into its immutable final form.
    pub fn seal(
        mut self,
        report: RecorderReport,
        end_epoch: f64,
        abort_reason: Option<AbortReason>,
    ) -> SealedRun {
        self.timeline.close(end_epoch);
        let completed = abort_reason.is_none();
        let summary = RunSummary::build(
            &self.run_uid,
            &report.records,
            report.stats,
            completed,
            abort_reason,
        );

        info!(
            run_uid = %self.run_uid,
            completed,
            abort_reason = ?abort_reason.map(|r| r.to_string()),
            total_frames = summary.total_frames,
            total_stalls = summary.total_stalls,
            "Run sealed"
        );

        SealedRun {
            run_uid: self.run_uid,
            records: report.records,
            timeline: self.timeline,
            summary,
        }
    }
}

impl Default for ExperimentRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Finalized, read-only result of one run.
#[derive(Debug)]
pub struct SealedRun {
    /// Unique run identifier
    pub run_uid: String,
    /// All measurement records, in arrival order
    pub records: Vec<MeasurementRecord>,
    /// Gapless phase timeline
    pub timeline: PhaseTimeline,
    /// Aggregated summary
    pub summary: RunSummary,
}

impl SealedRun {
    /// Whether both phases completed.
    pub fn completed(&self) -> bool {
        self.summary.completed
    }

    /// Write the phase timeline and run summary as JSON artifacts next to the
    /// measurement log. Returns the two paths.
    pub fn write_artifacts(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let timeline_path = dir.join(format!("timeline_{}.json", self.run_uid));
        let summary_path = dir.join(format!("summary_{}.json", self.run_uid));

        std::fs::write(
            &timeline_path,
            serde_json::to_string_pretty(&self.timeline)?,
        )?;
        std::fs::write(&summary_path, serde_json::to_string_pretty(&self.summary)?)?;

        info!(
            timeline = %timeline_path.display(),
            summary = %summary_path.display(),
            "Run artifacts written"
        );
        Ok((timeline_path, summary_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::recorder::RecorderStats;
    use crate::run::phase::Phase;

    fn report(frames: u64) -> RecorderReport {
        let records = (1..=frames)
            .map(|i| MeasurementRecord {
                timestamp: 100.0 + i as f64 * 0.033,
                frame_number: i,
                delta_ms: if i == 1 { 0.0 } else { 33.0 },
                fps: if i == 1 { 0.0 } else { 30.3 },
                is_stall: false,
                bitrate_kbps: 1200.0,
                elapsed_sec: i as f64 * 0.033,
                phase: Phase::Baseline,
            })
            .collect();
        RecorderReport {
            records,
            stats: RecorderStats {
                total_frames: frames,
                total_stalls: 0,
                sequence_anomalies: 0,
            },
        }
    }

    #[test]
    fn sealing_closes_timeline_and_sets_verdict() {
        let mut run = ExperimentRun::new();
        run.open_phase(Phase::Baseline, 100.0);
        run.open_phase(Phase::Attack, 115.0);

        let sealed = run.seal(report(3), 145.0, None);
        assert!(sealed.completed());
        assert_eq!(sealed.timeline.spans.len(), 2);
        assert_eq!(sealed.timeline.spans[1].end_time, Some(145.0));
        assert_eq!(sealed.records.len(), 3);
    }

    #[test]
    fn aborted_seal_preserves_partial_data() {
        let mut run = ExperimentRun::new();
        run.open_phase(Phase::Baseline, 100.0);

        let sealed = run.seal(report(2), 110.0, Some(AbortReason::SourceExhausted));
        assert!(!sealed.completed());
        assert_eq!(
            sealed.summary.abort_reason,
            Some(AbortReason::SourceExhausted)
        );
        assert_eq!(sealed.records.len(), 2);
        assert_eq!(sealed.timeline.spans[0].end_time, Some(110.0));
    }

    #[test]
    fn artifacts_round_trip_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = ExperimentRun::new();
        run.open_phase(Phase::Baseline, 100.0);
        let sealed = run.seal(report(1), 101.0, None);

        let (timeline_path, summary_path) =
            sealed.write_artifacts(dir.path()).expect("artifacts");
        assert!(timeline_path.exists());
        assert!(summary_path.exists());

        let timeline: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&timeline_path).expect("read"))
                .expect("json");
        assert_eq!(timeline["spans"][0]["phase"], "Baseline");
    }
}
