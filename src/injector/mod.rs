//! Load injector lifecycle control.
//!
//! The competing bulk transfer is an opaque process to the orchestrator: it
//! is started with a flow count, duration, and congestion-control algorithm
//! at the Baseline->Attack boundary, and stopped (best effort) when the
//! Attack phase ends or the run aborts. The [`LoadInjector`] trait is the
//! seam; [`iperf::ProcessInjector`] drives a real `iperf3` client and the
//! mocks in [`mock`] stand in for it in tests and injector-less runs.
//!
//! `stop` is idempotent: repeated calls return the same exit status and do
//! not attempt a second termination.

pub mod iperf;
pub mod mock;

use async_trait::async_trait;
use std::process::ExitStatus;
use thiserror::Error;

/// Parameters for one competing bulk transfer.
#[derive(Debug, Clone)]
pub struct InjectorSpec {
    /// Number of parallel TCP flows
    pub flow_count: u32,
    /// Transfer duration in seconds
    pub duration_sec: u64,
    /// Congestion control algorithm (e.g. "bbr")
    pub congestion_control: String,
    /// Bulk-transfer server address
    pub server_addr: String,
    /// Bulk-transfer server port
    pub port: u16,
}

/// Load injector lifecycle errors.
#[derive(Debug, Error)]
pub enum InjectorError {
    /// The competing process could not be launched, or exited before the
    /// launch confirmation window elapsed.
    #[error("launch failed: {0}")]
    Launch(String),

    /// The competing process could not be stopped or reaped.
    #[error("stop failed: {0}")]
    Stop(String),

    /// `start` called while a previous transfer is still running.
    #[error("injector already running")]
    AlreadyRunning,
}

/// How the competing transfer exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectorExit {
    /// OS exit code, if the process ran and exited normally
    pub code: Option<i32>,
    /// Whether the exit is considered clean (zero status, or terminated by
    /// the orchestrator's own stop)
    pub clean: bool,
}

impl InjectorExit {
    /// Exit status for a transfer that was never launched. `stop` on a
    /// never-started injector is treated as idempotent cleanup.
    pub fn not_started() -> Self {
        Self {
            code: None,
            clean: true,
        }
    }
}

impl From<ExitStatus> for InjectorExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            // A killed process reports no code; the orchestrator's own stop
            // is the only thing that kills it, so absence of a code is clean.
            clean: status.success() || status.code().is_none(),
        }
    }
}

/// Lifecycle control over the competing bulk transfer.
#[async_trait]
pub trait LoadInjector: Send {
    /// Initiate the competing transfer and confirm it launched. Returns once
    /// the process is confirmed running; it keeps transferring in the
    /// background for its configured duration.
    async fn start(&mut self, spec: &InjectorSpec) -> Result<(), InjectorError>;

    /// Stop the competing transfer and return its exit status. Idempotent:
    /// a second call returns the same status without touching the process.
    async fn stop(&mut self) -> Result<InjectorExit, InjectorError>;
}
