//! Phased experiment orchestration.
//!
//! The [`orchestrator::Orchestrator`] sequences a Baseline observation
//! window and an Attack observation window over one frame stream, starts and
//! stops the load injector at the phase boundary, and seals the result into
//! an immutable [`experiment::SealedRun`].

pub mod experiment;
pub mod orchestrator;
pub mod phase;

pub use experiment::{ExperimentRun, SealedRun};
pub use orchestrator::{abort_channel, AbortHandle, Orchestrator, OrchestratorState};
pub use phase::{Phase, PhaseSpan, PhaseTimeline};
