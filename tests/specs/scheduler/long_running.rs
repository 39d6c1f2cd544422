//! Long-running asynchronous modules must not stall the frame loop.

use crate::prelude::*;
use async_trait::async_trait;
use mh_core::{DataStrategy, ExecutionPolicy};
use mh_host::{Module, ModuleError, TickContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sleeps ~50 ms per tick and tracks its own concurrency.
struct SlowWorker {
    pub dts: Arc<Mutex<Vec<f32>>>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl SlowWorker {
    fn new() -> Self {
        Self {
            dts: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Module for SlowWorker {
    fn name(&self) -> &str {
        "slow-worker"
    }

    async fn tick(&self, ctx: &mut TickContext) -> Result<(), ModuleError> {
        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(live, Ordering::SeqCst);
        self.dts.lock().push(ctx.dt());

        tokio::time::sleep(Duration::from_millis(50)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A 60 Hz module whose tick takes ~3 frames: dispatched at most once
/// concurrently, never blocking the loop, with the accumulated dt of a
/// later dispatch reflecting the multi-frame gap.
#[tokio::test(start_paused = true)]
async fn long_module_spans_frames_without_stalling_the_loop() {
    let (mut kernel, clock) = kernel();
    let worker = SlowWorker::new();
    let dts = worker.dts.clone();
    let max_in_flight = worker.max_in_flight.clone();
    kernel
        .register_module(
            worker,
            ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(60),
        )
        .unwrap();
    kernel.initialize().unwrap();

    for _ in 0..16 {
        kernel.update(FRAME).await.unwrap();
        // virtual time drives both the module's sleep and the fake clock
        clock.advance(Duration::from_secs_f32(FRAME));
        tokio::time::sleep(Duration::from_secs_f32(FRAME)).await;
    }

    let dts = dts.lock();
    assert!(
        dts.len() >= 4,
        "a ~3-frame tick redispatches promptly, got {} dispatches",
        dts.len()
    );
    assert_eq!(
        max_in_flight.load(Ordering::SeqCst),
        1,
        "never more than one in-flight task per module"
    );

    // after the first, every dispatch sees the multi-frame gap
    for dt in dts.iter().skip(1) {
        assert!(
            (0.04..=0.09).contains(dt),
            "expected a multi-frame accumulated dt, got {}",
            dt
        );
    }
    assert_eq!(kernel.stats().modules[0].failures, 0, "within budget: no timeout");
}
