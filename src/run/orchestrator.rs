//! Phase orchestrator - state machine for phased load experiments.
//!
//! Drives one run through a quiescent Baseline window and a loaded Attack
//! window, triggering the load injector at the phase boundary and tagging
//! every measurement with its phase offset.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  run()   ┌──────────┐  baseline elapsed  ┌────────┐
//! │ Idle │─────────▶│ Baseline │───────────────────▶│ Attack │
//! └──────┘          └────┬─────┘  (injector start)  └───┬────┘
//!                        │                              │ attack elapsed
//!                        │ abort /                      │ (injector stop)
//!                        │ source exhausted /           ▼
//!                        │ injector launch failure  ┌───────────┐
//!                        ▼                          │ Completed │
//!                   ┌─────────┐                     └───────────┘
//!                   │ Aborted │◀── abort / source exhausted (Attack)
//!                   └─────────┘
//! ```
//!
//! Phase durations are measured against the monotonic clock, never
//! wall-clock-of-day. On every abort path the injector is stopped, the log
//! is flushed, and whatever was recorded is sealed and marked incomplete -
//! a run is never silently discarded.

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AbortReason, Result};
use crate::injector::{InjectorSpec, LoadInjector};
use crate::metrics::event::{ClockAnchor, FrameEvent};
use crate::metrics::recorder::MetricsRecorder;
use crate::run::experiment::{ExperimentRun, SealedRun};
use crate::run::phase::Phase;
use crate::storage::RecordSink;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Run not started yet
    Idle,
    /// Observing the stream with no competing load
    Baseline,
    /// Observing the stream with the competing load running
    Attack,
    /// Both phases finished, run sealed
    Completed,
    /// Run ended early, partial data sealed and marked incomplete
    Aborted,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorState::Idle => write!(f, "idle"),
            OrchestratorState::Baseline => write!(f, "baseline"),
            OrchestratorState::Attack => write!(f, "attack"),
            OrchestratorState::Completed => write!(f, "completed"),
            OrchestratorState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Handle for requesting an abort from outside the run (operator interrupt).
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Request an immediate abort. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create an abort handle and the receiver the orchestrator listens on.
pub fn abort_channel() -> (AbortHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, rx)
}

/// Phase orchestrator for one experiment run.
pub struct Orchestrator {
    config: Config,
    injector: Box<dyn LoadInjector>,
    state: OrchestratorState,
}

impl Orchestrator {
    /// Create an orchestrator with the given injector adapter.
    pub fn new(config: Config, injector: Box<dyn LoadInjector>) -> Self {
        Self {
            config,
            injector,
            state: OrchestratorState::Idle,
        }
    }

    /// Injector parameters derived from configuration.
    fn injector_spec(&self) -> InjectorSpec {
        InjectorSpec {
            flow_count: self.config.injector.flow_count,
            duration_sec: self.config.experiment.attack_duration_sec,
            congestion_control: self.config.injector.congestion_control.clone(),
            server_addr: self.config.injector.server_addr.clone(),
            port: self.config.injector.port,
        }
    }

    /// Execute the run to completion or abort.
    ///
    /// Consumes frame events from `frames` until both phase windows elapse,
    /// the source ends, the injector fails to launch, or `abort` fires.
    /// Always returns a sealed run (possibly incomplete) unless the
    /// measurement log itself failed.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<FrameEvent>,
        mut abort: watch::Receiver<bool>,
        sink: Box<dyn RecordSink>,
    ) -> Result<SealedRun> {
        let anchor = ClockAnchor::now();
        let start = Instant::now();
        let mut run = ExperimentRun::new();
        let mut recorder =
            MetricsRecorder::new(self.config.experiment.stall_threshold_ms, anchor, start, sink);

        self.state = OrchestratorState::Baseline;
        run.open_phase(Phase::Baseline, anchor.epoch_at(start));
        info!(
            run_uid = %run.run_uid,
            baseline_sec = self.config.experiment.baseline_duration_sec,
            attack_sec = self.config.experiment.attack_duration_sec,
            "Baseline phase started"
        );

        let mut deadline = start + self.config.baseline_duration();
        let mut abort_reason: Option<AbortReason> = None;
        // Disarmed once the handle is dropped, so a closed channel cannot
        // spin the select loop.
        let mut abort_armed = true;

        loop {
            tokio::select! {
                changed = abort.changed(), if abort_armed => {
                    match changed {
                        Ok(()) if *abort.borrow() => {
                            warn!(state = %self.state, "Operator abort received");
                            abort_reason = Some(AbortReason::OperatorAbort);
                            break;
                        }
                        Ok(()) => {}
                        Err(_) => abort_armed = false,
                    }
                }

                _ = sleep_until(deadline) => {
                    match self.state {
                        OrchestratorState::Baseline => {
                            let now = Instant::now();
                            recorder.begin_phase(Phase::Attack, now);
                            run.open_phase(Phase::Attack, anchor.epoch_at(now));
                            self.state = OrchestratorState::Attack;
                            info!(run_uid = %run.run_uid, "Attack phase started, launching competing load");

                            let spec = self.injector_spec();
                            match timeout(self.config.launch_timeout(), self.injector.start(&spec)).await {
                                Ok(Ok(())) => {
                                    deadline = now + self.config.attack_duration();
                                }
                                Ok(Err(e)) => {
                                    error!(error = %e, "Load injector failed to launch; aborting, Baseline data preserved");
                                    abort_reason = Some(AbortReason::InjectorLaunchFailure);
                                    break;
                                }
                                Err(_) => {
                                    error!(
                                        timeout_ms = self.config.injector.launch_timeout_ms,
                                        "Load injector launch confirmation timed out; aborting"
                                    );
                                    abort_reason = Some(AbortReason::InjectorLaunchFailure);
                                    break;
                                }
                            }
                        }
                        OrchestratorState::Attack => {
                            self.stop_injector().await;
                            self.state = OrchestratorState::Completed;
                            break;
                        }
                        state => {
                            // Idle/terminal states never hold a deadline
                            error!(state = %state, "Phase deadline fired in unexpected state");
                            break;
                        }
                    }
                }

                maybe_event = frames.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Err(e) = recorder.record(&event).await {
                                error!(error = %e, "Measurement log append failed");
                                self.stop_injector().await;
                                return Err(e);
                            }
                        }
                        None => {
                            warn!(state = %self.state, "Frame event source exhausted before run completion");
                            abort_reason = Some(AbortReason::SourceExhausted);
                            break;
                        }
                    }
                }
            }
        }

        if abort_reason.is_some() {
            // Best-effort cleanup on every abort path: stop is idempotent
            // and tolerates a never-started injector.
            self.stop_injector().await;
            self.state = OrchestratorState::Aborted;
        }

        let end = Instant::now();
        let report = recorder.finish().await?;
        info!(state = %self.state, "Run finished");
        Ok(run.seal(report, anchor.epoch_at(end), abort_reason))
    }

    /// Stop the injector, demoting failures to warnings: stopping is
    /// best-effort cleanup and never fails the run.
    async fn stop_injector(&mut self) {
        match self.injector.stop().await {
            Ok(exit) => {
                info!(code = ?exit.code, clean = exit.clean, "Competing load stopped");
            }
            Err(e) => {
                warn!(error = %e, "InjectorStopFailure: could not stop competing load cleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_names() {
        assert_eq!(OrchestratorState::Idle.to_string(), "idle");
        assert_eq!(OrchestratorState::Baseline.to_string(), "baseline");
        assert_eq!(OrchestratorState::Attack.to_string(), "attack");
        assert_eq!(OrchestratorState::Completed.to_string(), "completed");
        assert_eq!(OrchestratorState::Aborted.to_string(), "aborted");
    }

    #[test]
    fn abort_handle_is_repeatable() {
        let (handle, rx) = abort_channel();
        handle.trigger();
        handle.trigger();
        assert!(*rx.borrow());
    }
}
