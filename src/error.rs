//! Custom error types for the application.
//!
//! This module defines the primary error type, `MonitorError`, used across the
//! crate. Using the `thiserror` crate, it provides a centralized and consistent
//! way to handle the different failure classes of a measurement run:
//!
//! - **`Config` / `ConfigValidation`**: file/env parsing failures from
//!   `figment`, and semantic errors caught by validation (values that parse
//!   but are logically invalid, such as a zero phase duration).
//! - **`Io`**: standard `std::io::Error`, covering filesystem issues around
//!   the measurement log and run artifacts.
//! - **`Log`**: failures from the CSV measurement-log writer.
//! - **`Injector`**: failures from the load injector adapter. Launch failures
//!   are fatal to the Attack phase; stop failures are best-effort cleanup and
//!   are logged rather than propagated.
//! - **`InvalidState`**: an orchestrator operation attempted in a state that
//!   does not allow it.
//!
//! Anomalies that are *recorded* rather than raised (out-of-order frame
//! sequences, zero inter-frame deltas) never surface as errors; see
//! [`AbortReason`] for the run-level outcome taxonomy.

use serde::Serialize;
use thiserror::Error;

use crate::injector::InjectorError;

/// Convenience alias for results using the application error type.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration loading error (file or environment).
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Semantic configuration error caught during validation.
    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Measurement log write error.
    #[error("Measurement log error: {0}")]
    Log(#[from] csv::Error),

    /// Run artifact serialization error.
    #[error("Artifact serialization error: {0}")]
    Artifact(#[from] serde_json::Error),

    /// Load injector lifecycle error.
    #[error("Load injector error: {0}")]
    Injector(#[from] InjectorError),

    /// Operation attempted in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Why a run ended without completing both phases.
///
/// A sealed run always carries `completed` plus an optional abort reason so
/// downstream analysis can distinguish a clean result from a truncated one
/// instead of inferring it from missing rows. The `Display` form is the
/// string written into the run summary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    /// The competing bulk transfer could not be launched at the
    /// Baseline->Attack boundary. Baseline data is preserved.
    InjectorLaunchFailure,
    /// The frame stream ended before the Attack phase completed.
    SourceExhausted,
    /// An external abort signal (operator interrupt) arrived.
    OperatorAbort,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::InjectorLaunchFailure => write!(f, "InjectorLaunchFailure"),
            AbortReason::SourceExhausted => write!(f, "SourceExhausted"),
            AbortReason::OperatorAbort => write!(f, "OperatorAbort"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_reason_display_matches_taxonomy() {
        assert_eq!(
            AbortReason::InjectorLaunchFailure.to_string(),
            "InjectorLaunchFailure"
        );
        assert_eq!(AbortReason::SourceExhausted.to_string(), "SourceExhausted");
        assert_eq!(AbortReason::OperatorAbort.to_string(), "OperatorAbort");
    }

    #[test]
    fn injector_error_converts_into_monitor_error() {
        let err = InjectorError::Launch("iperf3 not found".into());
        let monitor: MonitorError = err.into();
        assert!(monitor.to_string().contains("iperf3 not found"));
    }
}
