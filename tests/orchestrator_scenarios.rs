//! End-to-end orchestrator scenarios: clean baseline, induced stall,
//! injector launch failure, and operator abort mid-attack.
//!
//! All scenarios run on the paused tokio clock, so the real phase durations
//! (15s baseline, 30s attack) execute instantly and deterministically.

use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{advance, sleep, Duration, Instant};

use stallwatch::config::Config;
use stallwatch::injector::mock::MockInjector;
use stallwatch::metrics::event::{FrameEvent, MeasurementRecord};
use stallwatch::run::{abort_channel, Orchestrator, Phase};
use stallwatch::source::SyntheticSource;
use stallwatch::storage::{MemorySink, RecordSink};
use stallwatch::{AbortReason, Result};

/// Test sink whose state stays observable after the orchestrator consumes it.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<MemorySink>>);

impl SharedSink {
    fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> usize {
        self.0.lock().expect("sink lock").rows.len()
    }

    fn closed(&self) -> bool {
        self.0.lock().expect("sink lock").closed
    }
}

#[async_trait]
impl RecordSink for SharedSink {
    async fn append(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.0.lock().expect("sink lock").rows.push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.0.lock().expect("sink lock").flushes += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        let mut inner = self.0.lock().expect("sink lock");
        inner.flushes += 1;
        inner.closed = true;
        Ok(())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    // Defaults: 15s baseline, 30s attack, 100ms stall threshold
    config.output.flush_interval_ms = 1000;
    config
}

#[tokio::test(start_paused = true)]
async fn scenario_a_clean_baseline_transitions_on_time() {
    let injector = MockInjector::healthy();
    let starts = injector.start_count();

    let (tx, rx) = mpsc::channel(256);
    let source = SyntheticSource::steady(30.0).with_max_frames(1400).spawn(tx);
    let (_abort, abort_rx) = abort_channel();

    let sealed = Orchestrator::new(test_config(), Box::new(injector))
        .run(rx, abort_rx, Box::new(SharedSink::new()))
        .await
        .expect("run");
    source.abort();

    assert!(sealed.completed());
    assert!(sealed.summary.abort_reason.is_none());

    // ~450 frames arrive at a steady 33ms cadence over the 15s baseline,
    // all tagged Baseline with no stall.
    let baseline: Vec<_> = sealed
        .records
        .iter()
        .filter(|r| r.phase == Phase::Baseline)
        .collect();
    assert!(
        (440..=455).contains(&baseline.len()),
        "baseline frames: {}",
        baseline.len()
    );
    assert!(baseline.iter().all(|r| !r.is_stall));

    // Frame numbers are gapless and match the source sequence.
    for (i, record) in sealed.records.iter().enumerate() {
        assert_eq!(record.frame_number, i as u64 + 1);
    }

    // The Baseline->Attack transition happened at t ~= 15.0s.
    assert_eq!(sealed.timeline.spans.len(), 2);
    assert_eq!(sealed.timeline.spans[0].phase, Phase::Baseline);
    assert_eq!(sealed.timeline.spans[1].phase, Phase::Attack);
    let span = &sealed.timeline.spans[0];
    let baseline_len = span.end_time.expect("closed span") - span.start_time;
    assert!(
        (baseline_len - 15.0).abs() < 0.25,
        "baseline span: {baseline_len}"
    );

    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_induced_stall_is_recorded_exactly() {
    let (tx, rx) = mpsc::channel(16);
    let (_abort, abort_rx) = abort_channel();

    let orchestrator = Orchestrator::new(test_config(), Box::new(MockInjector::healthy()));
    let run = tokio::spawn(async move {
        orchestrator
            .run(rx, abort_rx, Box::new(SharedSink::new()))
            .await
    });

    // Two frames 350ms apart, well inside the baseline window.
    tx.send(FrameEvent {
        arrival: Instant::now(),
        sequence: 1,
        byte_size: 5000,
    })
    .await
    .expect("send frame 1");
    sleep(Duration::from_millis(350)).await;
    tx.send(FrameEvent {
        arrival: Instant::now(),
        sequence: 2,
        byte_size: 5000,
    })
    .await
    .expect("send frame 2");
    advance(Duration::from_millis(10)).await;

    // Ending the stream before Attack completes aborts the run but must
    // preserve everything recorded so far.
    drop(tx);
    let sealed = run.await.expect("join").expect("run");

    assert!(!sealed.completed());
    assert_eq!(
        sealed.summary.abort_reason,
        Some(AbortReason::SourceExhausted)
    );
    assert_eq!(sealed.summary.abort_reason.map(|r| r.to_string()),
        Some("SourceExhausted".to_string()));

    assert_eq!(sealed.records.len(), 2);
    let first = &sealed.records[0];
    assert_eq!(first.delta_ms, 0.0);
    assert_eq!(first.fps, 0.0);

    let stalled = &sealed.records[1];
    assert!((stalled.delta_ms - 350.0).abs() < 1e-6);
    assert!(stalled.is_stall);
    assert!((stalled.fps - 2.857).abs() < 0.01);
    assert_eq!(sealed.summary.total_stalls, 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_injector_launch_failure_preserves_baseline() {
    let injector = MockInjector::failing();
    let stops = injector.stop_count();

    let (tx, rx) = mpsc::channel(256);
    let source = SyntheticSource::steady(30.0).with_max_frames(1400).spawn(tx);
    let (_abort, abort_rx) = abort_channel();

    let sink = SharedSink::new();
    let sealed = Orchestrator::new(test_config(), Box::new(injector))
        .run(rx, abort_rx, Box::new(sink.clone()))
        .await
        .expect("run");
    source.abort();

    assert!(!sealed.completed());
    assert_eq!(
        sealed.summary.abort_reason,
        Some(AbortReason::InjectorLaunchFailure)
    );
    assert_eq!(
        sealed.summary.abort_reason.map(|r| r.to_string()),
        Some("InjectorLaunchFailure".to_string())
    );

    // All baseline records intact, none lost to the abort.
    assert!(sealed.records.len() >= 400, "records: {}", sealed.records.len());
    assert!(sealed
        .records
        .iter()
        .all(|r| r.phase == Phase::Baseline || r.elapsed_sec < 1.0));
    assert_eq!(sealed.records.len(), sink.rows());
    assert!(sink.closed(), "log must be flushed and closed");

    // Cleanup stop was attempted even though nothing launched.
    assert!(stops.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_abort_mid_attack_stops_injector_and_flushes() {
    let injector = MockInjector::healthy();
    let stops = injector.stop_count();

    let (tx, rx) = mpsc::channel(256);
    let source = SyntheticSource::steady(30.0).with_max_frames(1400).spawn(tx);
    let (abort_handle, abort_rx) = abort_channel();

    // 10s into the attack window (baseline is 15s)
    tokio::spawn(async move {
        sleep(Duration::from_secs(25)).await;
        abort_handle.trigger();
    });

    let sink = SharedSink::new();
    let sealed = Orchestrator::new(test_config(), Box::new(injector))
        .run(rx, abort_rx, Box::new(sink.clone()))
        .await
        .expect("run");
    source.abort();

    assert!(!sealed.completed());
    assert_eq!(sealed.summary.abort_reason, Some(AbortReason::OperatorAbort));
    assert!(stops.load(Ordering::SeqCst) >= 1, "injector must be stopped");
    assert!(sink.closed(), "log must be flushed on abort");

    // Attack-phase records exist and their phase clock restarted from zero.
    let attack: Vec<_> = sealed
        .records
        .iter()
        .filter(|r| r.phase == Phase::Attack)
        .collect();
    assert!(!attack.is_empty());
    let first_attack = attack
        .iter()
        .map(|r| r.elapsed_sec)
        .fold(f64::INFINITY, f64::min);
    assert!(first_attack < 0.1, "attack phase clock must reset: {first_attack}");
    let max_attack = attack
        .iter()
        .map(|r| r.elapsed_sec)
        .fold(0.0_f64, f64::max);
    assert!(
        (9.0..=11.0).contains(&max_attack),
        "abort at ~10s into attack: {max_attack}"
    );
}

#[tokio::test(start_paused = true)]
async fn elapsed_sec_is_strictly_increasing_within_each_phase() {
    let (tx, rx) = mpsc::channel(256);
    let source = SyntheticSource::steady(30.0).with_max_frames(1400).spawn(tx);
    let (_abort, abort_rx) = abort_channel();

    let sealed = Orchestrator::new(test_config(), Box::new(MockInjector::healthy()))
        .run(rx, abort_rx, Box::new(SharedSink::new()))
        .await
        .expect("run");
    source.abort();

    for phase in [Phase::Baseline, Phase::Attack] {
        let elapsed: Vec<f64> = sealed
            .records
            .iter()
            .filter(|r| r.phase == phase)
            .map(|r| r.elapsed_sec)
            .collect();
        assert!(!elapsed.is_empty());
        assert!(
            elapsed.windows(2).all(|w| w[1] > w[0]),
            "elapsed_sec must strictly increase within {phase}"
        );
    }
}
