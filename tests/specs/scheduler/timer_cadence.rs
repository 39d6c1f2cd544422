//! Timer-driven dispatch cadence.

use crate::prelude::*;
use mh_core::{DataStrategy, ExecutionPolicy};
use std::sync::atomic::Ordering;

/// An asynchronous 10 Hz snapshot module over 60 frames at 60 fps runs
/// ten times, each dispatch seeing ~100 ms of accumulated dt.
#[tokio::test]
async fn ten_hz_module_runs_ten_times_in_a_second() {
    let (mut kernel, clock) = kernel();
    let probe = Probe::new("analytics");
    let runs = probe.runs.clone();
    let dts = probe.dts.clone();
    kernel
        .register_module(
            probe,
            ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(10),
        )
        .unwrap();
    kernel.initialize().unwrap();

    run_frames(&mut kernel, &clock, 60).await;

    assert_eq!(runs.load(Ordering::SeqCst), 10);
    let dts = dts.lock();
    assert_eq!(dts.len(), 10);
    for dt in dts.iter() {
        assert!(
            (0.099..=0.101).contains(dt),
            "expected ~100ms accumulated per dispatch, got {}",
            dt
        );
    }
    assert_eq!(kernel.stats().modules[0].failures, 0);
}

/// A 1 Hz module with no watches runs exactly once per 60 frames.
#[tokio::test]
async fn one_hz_module_runs_once_per_second() {
    let (mut kernel, clock) = kernel();
    let probe = Probe::new("slow");
    let runs = probe.runs.clone();
    kernel
        .register_module(
            probe,
            ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(1),
        )
        .unwrap();
    kernel.initialize().unwrap();

    run_frames(&mut kernel, &clock, 59).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    run_frames(&mut kernel, &clock, 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1, "fires at the one-second mark");

    run_frames(&mut kernel, &clock, 59).await;
    let total = runs.load(Ordering::SeqCst);
    assert!(
        (1..=2).contains(&total),
        "±1 frame of quantization jitter allowed, got {}",
        total
    );
}

/// Module last-seen ticks never lead the world's tick.
#[tokio::test]
async fn view_ticks_trail_the_global_tick() {
    let (mut kernel, clock) = kernel();
    let probe = Probe::new("ticker");
    let ticks = probe.ticks.clone();
    kernel
        .register_module(
            probe,
            ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(30),
        )
        .unwrap();
    kernel.initialize().unwrap();

    run_frames(&mut kernel, &clock, 30).await;
    let global = kernel.tick();
    for tick in ticks.lock().iter() {
        assert!(*tick <= global);
    }
    assert_eq!(
        kernel.stats().modules[0].last_run_tick.min(global),
        kernel.stats().modules[0].last_run_tick
    );
}
