//! Executor tests against the real `steamgate-worker` binary.
//!
//! Every test uses the simulated backend, so no Steam client is needed.

use std::thread;
use std::time::{Duration, Instant};

use steamgate::gateway::SIMULATED_STEAM_ID;
use steamgate::{
    AppId, Backend, Error, Executor, ExecutorConfig, Lifecycle, LoggedOn, RemoteError, ServerTime,
    SimulatedConfig, SteamId, current_code,
};

const SERVER_TIME: u64 = 1_700_000_000;

fn simulated(sim: SimulatedConfig) -> ExecutorConfig {
    ExecutorConfig::new(480)
        .with_worker_path(env!("CARGO_BIN_EXE_steamgate-worker"))
        .with_backend(Backend::Simulated(sim))
        .with_response_timeout(Duration::from_secs(10))
        .with_join_timeout(Duration::from_secs(5))
        .with_poll_tick(Duration::from_millis(10))
}

fn ready_executor(sim: SimulatedConfig) -> Executor {
    let mut executor = Executor::new(simulated(sim));
    executor.init().expect("init should succeed");
    executor
}

/// Poll until the worker process is gone.
fn wait_for_exit(executor: &mut Executor) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while executor.is_worker_alive() {
        assert!(Instant::now() < deadline, "worker did not exit");
        thread::sleep(Duration::from_millis(20));
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_init_and_call() {
    let mut executor = Executor::new(simulated(
        SimulatedConfig::default().with_server_time(SERVER_TIME),
    ));

    let report = executor.init().unwrap();
    assert_eq!(report.app_id, 480);
    assert_eq!(executor.state(), Lifecycle::Ready);
    assert!(executor.pid().is_some());

    assert_eq!(executor.call(ServerTime).unwrap(), SERVER_TIME);
    assert_eq!(executor.call(AppId).unwrap(), 480);
    assert!(executor.call(LoggedOn).unwrap());
    assert_eq!(executor.call(SteamId).unwrap(), SIMULATED_STEAM_ID);

    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
    assert!(executor.pid().is_none());
}

#[test]
fn test_call_before_init() {
    let mut executor = Executor::new(simulated(SimulatedConfig::default()));

    let err = executor.call(ServerTime).unwrap_err();
    assert!(matches!(err, Error::NotReady(Lifecycle::Created)));
    assert!(executor.pid().is_none());
}

#[test]
fn test_init_twice_is_rejected() {
    let mut executor = ready_executor(SimulatedConfig::default());

    let err = executor.init().unwrap_err();
    assert!(matches!(err, Error::AlreadyStarted(Lifecycle::Ready)));
    assert_eq!(executor.call(AppId).unwrap(), 480);
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut executor = ready_executor(SimulatedConfig::default());

    executor.shutdown();
    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
    assert!(!executor.is_worker_alive());
    assert!(executor.exit_signal().is_set());

    let started = Instant::now();
    assert!(matches!(
        executor.call(ServerTime),
        Err(Error::NotReady(Lifecycle::Stopped))
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_restart_after_shutdown() {
    let mut executor = ready_executor(SimulatedConfig::default().with_server_time(30));
    let first_pid = executor.pid();
    executor.shutdown();

    executor.init().unwrap();
    assert_eq!(executor.state(), Lifecycle::Ready);
    assert!(!executor.exit_signal().is_set());
    assert_ne!(executor.pid(), first_pid);
    assert_eq!(executor.server_time().unwrap(), 30);
    executor.shutdown();
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_init_error_faults_the_executor() {
    let sim = SimulatedConfig::default()
        .with_init_error(RemoteError::new("SteamInitError", "no Steam client running"));
    let mut executor = Executor::new(simulated(sim));

    match executor.init().unwrap_err() {
        Error::InitializationFailed(remote) => {
            assert_eq!(remote.kind, "SteamInitError");
            assert_eq!(remote.message, "no Steam client running");
        }
        other => panic!("Unexpected error: {:?}", other),
    }
    assert_eq!(executor.state(), Lifecycle::Faulted);
    assert!(!executor.is_worker_alive());

    let err = executor.call(ServerTime).unwrap_err();
    assert!(matches!(err, Error::NotReady(Lifecycle::Faulted)));

    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
}

#[test]
fn test_init_error_detail_crosses_the_process_boundary() {
    let sim = SimulatedConfig::default().with_init_error(
        RemoteError::new("SymbolMissing", "not exported").with_detail("SteamAPI_Init"),
    );
    let mut executor = Executor::new(simulated(sim));

    match executor.init().unwrap_err() {
        Error::InitializationFailed(remote) => {
            assert_eq!(remote.kind, "SymbolMissing");
            assert_eq!(remote.detail.as_deref(), Some("SteamAPI_Init"));
        }
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[test]
fn test_refused_init() {
    let mut executor = Executor::new(simulated(SimulatedConfig::default().refusing_init()));

    match executor.init().unwrap_err() {
        Error::InitializationFailed(remote) => assert_eq!(remote.kind, "InitializationRefused"),
        other => panic!("Unexpected error: {:?}", other),
    }
    assert_eq!(executor.state(), Lifecycle::Faulted);
}

#[test]
fn test_remote_error_ends_the_worker() {
    let sim = SimulatedConfig::default().with_call_error(RemoteError::new("ValueError", "boom"));
    let mut executor = ready_executor(sim);

    let err = executor.call(ServerTime).unwrap_err();
    assert!(err.requires_restart());
    match err {
        Error::Remote(remote) => {
            assert_eq!(remote.kind, "ValueError");
            assert_eq!(remote.message, "boom");
        }
        other => panic!("Unexpected error: {:?}", other),
    }

    wait_for_exit(&mut executor);

    // Both outcome channels are closed, so this fails without waiting out
    // the response timeout.
    let started = Instant::now();
    let err = executor.call(ServerTime).unwrap_err();
    assert!(matches!(err, Error::NoResponse { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));

    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
}

#[test]
fn test_call_timeout() {
    let sim = SimulatedConfig::default().with_call_delay(Duration::from_secs(5));
    let config = simulated(sim)
        .with_response_timeout(Duration::from_millis(1500))
        .with_join_timeout(Duration::from_millis(500));
    let mut executor = Executor::new(config);
    executor.init().unwrap();

    let started = Instant::now();
    match executor.call(ServerTime).unwrap_err() {
        Error::NoResponse { waited } => assert!(waited >= Duration::from_millis(1500)),
        other => panic!("Unexpected error: {:?}", other),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500));
    assert!(elapsed < Duration::from_secs(5));

    // The worker is still stuck in the call; shutdown kills it.
    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
    assert!(!executor.is_worker_alive());
}

#[test]
fn test_init_timeout_faults_and_reaps_the_worker() {
    let sim = SimulatedConfig::default().with_init_delay(Duration::from_secs(30));
    let config = simulated(sim).with_response_timeout(Duration::from_millis(500));
    let mut executor = Executor::new(config);

    let started = Instant::now();
    match executor.init().unwrap_err() {
        Error::NoResponse { waited } => assert!(waited >= Duration::from_millis(500)),
        other => panic!("Unexpected error: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(executor.state(), Lifecycle::Faulted);
    assert!(!executor.is_worker_alive());
    assert!(executor.pid().is_none());

    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
}

#[test]
fn test_late_answer_is_not_returned_to_the_next_call() {
    let sim = SimulatedConfig::default()
        .with_server_time(SERVER_TIME)
        .with_call_delay(Duration::from_millis(1000));
    let config = simulated(sim)
        .with_response_timeout(Duration::from_millis(500))
        .with_join_timeout(Duration::from_millis(500));
    let mut executor = Executor::new(config);
    executor.init().unwrap();

    assert!(matches!(executor.call(ServerTime), Err(Error::NoResponse { .. })));
    // Let the worker finish the abandoned call and deliver its answer.
    thread::sleep(Duration::from_millis(1500));

    // The next call is also slower than the timeout, so only the stale
    // answer could make it succeed.
    assert!(matches!(executor.call(ServerTime), Err(Error::NoResponse { .. })));
    assert_eq!(executor.state(), Lifecycle::Ready);

    executor.shutdown();
    assert_eq!(executor.state(), Lifecycle::Stopped);
}

#[test]
fn test_restart_after_remote_error() {
    let sim = SimulatedConfig::default().with_call_error(RemoteError::new("ValueError", "boom"));
    let mut executor = ready_executor(sim);
    assert!(executor.call(AppId).is_err());

    executor.shutdown();
    executor.init().unwrap();
    assert!(matches!(executor.call(AppId), Err(Error::Remote(_))));
}

#[test]
fn test_missing_worker_binary() {
    let config = ExecutorConfig::new(480).with_worker_path("/nonexistent/steamgate-worker");
    let mut executor = Executor::new(config);

    assert!(matches!(executor.init(), Err(Error::Spawn(_))));
    assert_eq!(executor.state(), Lifecycle::Faulted);
}

// =============================================================================
// Codes
// =============================================================================

#[test]
fn test_current_code_uses_worker_time() {
    let mut executor = ready_executor(SimulatedConfig::default().with_server_time(0));

    let code = current_code(&mut executor, "AAAAAAAAAAAAAAAA").unwrap();
    assert_eq!(code.code, "RYH4D");
    assert_eq!(code.server_time, 0);
    assert_eq!(code.seconds_remaining(0), 30);
}

#[test]
fn test_current_code_with_invalid_secret() {
    let mut executor = ready_executor(SimulatedConfig::default().with_server_time(0));

    let err = current_code(&mut executor, "***").unwrap_err();
    assert!(matches!(err, Error::InvalidSecret(_)));
    // Secret decoding happens locally; the worker is unaffected.
    assert_eq!(executor.call(ServerTime).unwrap(), 0);
}
