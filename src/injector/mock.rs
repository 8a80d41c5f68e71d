//! Mock load injectors.
//!
//! Simulated injector implementations for testing the orchestrator without a
//! real bulk-transfer process, plus a [`NullInjector`] for monitor-only runs
//! where no competing load is wanted.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

use super::{InjectorError, InjectorExit, InjectorSpec, LoadInjector};

/// Scripted injector for tests.
///
/// Records lifecycle calls and can be configured to fail at launch, which
/// exercises the orchestrator's `InjectorLaunchFailure` abort path.
pub struct MockInjector {
    fail_launch: bool,
    running: bool,
    last_exit: Option<InjectorExit>,
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
    /// Spec from the most recent successful start
    pub last_spec: Option<InjectorSpec>,
}

impl MockInjector {
    /// Injector whose launches always succeed.
    pub fn healthy() -> Self {
        Self::new(false)
    }

    /// Injector whose launches always fail.
    pub fn failing() -> Self {
        Self::new(true)
    }

    fn new(fail_launch: bool) -> Self {
        Self {
            fail_launch,
            running: false,
            last_exit: None,
            starts: Arc::new(AtomicU32::new(0)),
            stops: Arc::new(AtomicU32::new(0)),
            last_spec: None,
        }
    }

    /// Shared counter of start attempts.
    pub fn start_count(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.starts)
    }

    /// Shared counter of stop calls.
    pub fn stop_count(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.stops)
    }
}

#[async_trait]
impl LoadInjector for MockInjector {
    async fn start(&mut self, spec: &InjectorSpec) -> Result<(), InjectorError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(InjectorError::Launch("scripted launch failure".into()));
        }
        if self.running {
            return Err(InjectorError::AlreadyRunning);
        }
        self.running = true;
        self.last_spec = Some(spec.clone());
        Ok(())
    }

    async fn stop(&mut self) -> Result<InjectorExit, InjectorError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.running {
            self.running = false;
            let exit = InjectorExit {
                code: Some(0),
                clean: true,
            };
            self.last_exit = Some(exit);
            return Ok(exit);
        }
        Ok(self.last_exit.unwrap_or_else(InjectorExit::not_started))
    }
}

/// No-op injector for monitor-only runs.
pub struct NullInjector;

#[async_trait]
impl LoadInjector for NullInjector {
    async fn start(&mut self, _spec: &InjectorSpec) -> Result<(), InjectorError> {
        info!("Injector disabled; Attack phase runs without competing load");
        Ok(())
    }

    async fn stop(&mut self) -> Result<InjectorExit, InjectorError> {
        Ok(InjectorExit::not_started())
    }
}
