//! Subprocess injector lifecycle against real processes.
//!
//! Uses a throwaway shell script as the client binary, so no iperf3
//! installation is needed to exercise launch confirmation, stop, and
//! stop idempotence.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use stallwatch::injector::iperf::ProcessInjector;
use stallwatch::injector::{InjectorError, InjectorExit, InjectorSpec, LoadInjector};

fn spec() -> InjectorSpec {
    InjectorSpec {
        flow_count: 10,
        duration_sec: 30,
        congestion_control: "bbr".to_string(),
        server_addr: "127.0.0.1".to_string(),
        port: 5202,
    }
}

/// Write an executable script into `dir` and return its path as a string.
fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn launch_stop_and_repeated_stop() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Accepts any arguments and stays up well past the test
    let binary = script(&dir, "fake_client", "#!/bin/sh\nsleep 30\n");

    let mut injector = ProcessInjector::new(binary);
    injector.start(&spec()).await.expect("launch");

    let first = injector.stop().await.expect("stop");
    assert!(first.code.is_some() || first.clean);

    // Stop is idempotent: the cached exit comes back unchanged.
    let second = injector.stop().await.expect("repeated stop");
    assert_eq!(first, second);
}

#[tokio::test]
async fn immediate_exit_is_a_launch_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let binary = script(&dir, "dying_client", "#!/bin/sh\nexit 1\n");

    let mut injector =
        ProcessInjector::new(binary).with_confirm_window(Duration::from_millis(500));
    let err = injector.start(&spec()).await.expect_err("must fail");
    assert!(matches!(err, InjectorError::Launch(_)));

    // Nothing launched, so stop reports a clean non-start.
    let exit = injector.stop().await.expect("stop");
    assert_eq!(exit, InjectorExit::not_started());
}

#[tokio::test]
async fn restart_after_stop_is_allowed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let binary = script(&dir, "fake_client", "#!/bin/sh\nsleep 30\n");

    let mut injector = ProcessInjector::new(binary);
    injector.start(&spec()).await.expect("first launch");
    injector.stop().await.expect("stop");
    injector.start(&spec()).await.expect("second launch");
    injector.stop().await.expect("final stop");
}
