//! # stallwatch
//!
//! Measures whether a large competing bulk-TCP transfer disrupts a real-time
//! video stream, producing timestamped evidence of stalls and throughput
//! degradation across two sequential network conditions: a quiescent
//! Baseline window and an Attack window during which the competing load
//! runs.
//!
//! The crate consumes frame-arrival events from an opaque media pipeline and
//! treats the competing transfer as an opaque process with a start/stop
//! lifecycle; it emits an ordered CSV measurement log, a phase timeline, and
//! a run summary for downstream report tooling.
//!
//! ## Crate Structure
//!
//! - **`config`**: layered TOML/env configuration with validation.
//! - **`error`**: the `MonitorError` enum and the run-level `AbortReason`
//!   taxonomy.
//! - **`injector`**: the `LoadInjector` seam, the `iperf3` subprocess
//!   adapter, and mocks.
//! - **`metrics`**: frame events, the stall-aware recorder, and run summary
//!   statistics.
//! - **`run`**: phases, the experiment run container, and the phase
//!   orchestrator state machine.
//! - **`source`**: synthetic frame source for in-process runs and tests.
//! - **`storage`**: the measurement-log sink trait and the buffered CSV
//!   writer.
//! - **`telemetry`**: tracing initialization.

pub mod config;
pub mod error;
pub mod injector;
pub mod metrics;
pub mod run;
pub mod source;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{AbortReason, MonitorError, Result};
pub use metrics::{FrameEvent, MeasurementRecord, MetricsRecorder};
pub use run::{abort_channel, Orchestrator, Phase, SealedRun};
