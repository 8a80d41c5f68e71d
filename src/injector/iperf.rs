//! Subprocess adapter driving an `iperf3` client as the load injector.
//!
//! The command shape matches the canonical competing-transfer invocation:
//! `iperf3 -c <server> -p <port> -C <cc> -P <flows> -t <secs>`. The process
//! is spawned with `kill_on_drop` so it cannot outlive the run even if the
//! orchestrator task is torn down without a stop call.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{InjectorError, InjectorExit, InjectorSpec, LoadInjector};

/// Default window within which an immediately-exiting process is reported
/// as a launch failure.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_millis(250);

/// Load injector backed by a bulk-transfer client subprocess.
pub struct ProcessInjector {
    binary: String,
    confirm_window: Duration,
    child: Option<Child>,
    last_exit: Option<InjectorExit>,
}

impl ProcessInjector {
    /// Create an injector that launches the given client binary.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            confirm_window: DEFAULT_CONFIRM_WINDOW,
            child: None,
            last_exit: None,
        }
    }

    /// Override the launch confirmation window.
    pub fn with_confirm_window(mut self, window: Duration) -> Self {
        self.confirm_window = window;
        self
    }

    /// Argument vector for one transfer.
    fn args(spec: &InjectorSpec) -> Vec<String> {
        vec![
            "-c".to_string(),
            spec.server_addr.clone(),
            "-p".to_string(),
            spec.port.to_string(),
            "-C".to_string(),
            spec.congestion_control.clone(),
            "-P".to_string(),
            spec.flow_count.to_string(),
            "-t".to_string(),
            spec.duration_sec.to_string(),
        ]
    }
}

#[async_trait]
impl LoadInjector for ProcessInjector {
    async fn start(&mut self, spec: &InjectorSpec) -> Result<(), InjectorError> {
        if self.child.is_some() {
            return Err(InjectorError::AlreadyRunning);
        }

        let args = Self::args(spec);
        debug!(binary = %self.binary, ?args, "Spawning load injector");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InjectorError::Launch(format!("{}: {}", self.binary, e)))?;

        // Launch confirmation: a client that dies inside the window (bad
        // server address, unknown congestion control, missing binary flags)
        // never generated competing load, so the Attack phase must not begin.
        match timeout(self.confirm_window, child.wait()).await {
            Ok(Ok(status)) => Err(InjectorError::Launch(format!(
                "{} exited immediately: {}",
                self.binary, status
            ))),
            Ok(Err(e)) => Err(InjectorError::Launch(format!(
                "failed to observe {}: {}",
                self.binary, e
            ))),
            Err(_) => {
                let pid = child.id();
                info!(
                    binary = %self.binary,
                    pid = ?pid,
                    flows = spec.flow_count,
                    cc = %spec.congestion_control,
                    duration_sec = spec.duration_sec,
                    "Load injector running"
                );
                self.child = Some(child);
                self.last_exit = None;
                Ok(())
            }
        }
    }

    async fn stop(&mut self) -> Result<InjectorExit, InjectorError> {
        if let Some(mut child) = self.child.take() {
            // start_kill fails if the process already exited; wait() below
            // reaps it either way.
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "Injector already exited before kill");
            }
            let status = child
                .wait()
                .await
                .map_err(|e| InjectorError::Stop(e.to_string()))?;
            let exit = InjectorExit::from(status);
            info!(code = ?exit.code, clean = exit.clean, "Load injector stopped");
            self.last_exit = Some(exit);
            return Ok(exit);
        }

        if let Some(exit) = self.last_exit {
            debug!("Injector stop repeated; returning cached exit status");
            return Ok(exit);
        }

        warn!("Injector stop requested but it was never started");
        Ok(InjectorExit::not_started())
    }
}
