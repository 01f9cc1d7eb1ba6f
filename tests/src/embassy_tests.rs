//! Embassy-time driver running on the std time driver

use std::time::{Duration, Instant};

use morse_core::hal::mock::MockTorch;
use morse_core::{emission_task, Emitter, SingleShot, TimingConfig, STOP_POLL_INTERVAL_MS};
use portable_atomic::{AtomicBool, Ordering};

fn emitter() -> Emitter<MockTorch, TimingConfig, SingleShot> {
    Emitter::new(MockTorch::new(), TimingConfig::default(), SingleShot::new())
}

/// Test that the task returns at once when nothing is armed
#[test]
fn test_emission_task_idle_returns() {
    let stop = AtomicBool::new(false);
    let mut emitter = emitter();

    let start = Instant::now();
    tokio_test::block_on(emission_task(&mut emitter, &stop)).unwrap();
    assert!(start.elapsed() < Duration::from_millis(50));
    assert_eq!(emitter.actuator().toggles(), 0);
}

/// Test the stop flag against a running emission
#[tokio::test]
async fn test_emission_task_honours_stop_flag() {
    println!("🕒 Testing emission task stop latency...");
    let stop = AtomicBool::new(false);
    let mut emitter = emitter();
    emitter.start_raw("E");

    // E lit 0..100, letter gap until 400: stop lands in the dark
    let stopped_at = Instant::now();
    let (result, _) = tokio::join!(emission_task(&mut emitter, &stop), async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        stop.store(true, Ordering::Relaxed);
    });
    let elapsed = stopped_at.elapsed();

    assert!(result.is_ok());
    assert!(elapsed < Duration::from_millis(250 + STOP_POLL_INTERVAL_MS + 50));
    assert!(!emitter.is_emitting());
    assert!(!emitter.actuator().is_on());
    assert_eq!(emitter.actuator().activations(), 1);
    println!("  ✅ Stopped after {}ms", elapsed.as_millis());
}

/// Test that a preset stop flag cancels before the first mark
#[tokio::test]
async fn test_emission_task_preset_stop() {
    let stop = AtomicBool::new(true);
    let mut emitter = emitter();
    emitter.start_raw("SOS");

    emission_task(&mut emitter, &stop).await.unwrap();
    assert_eq!(emitter.actuator().activations(), 0);
    assert!(emitter.phrase().is_empty());
}
