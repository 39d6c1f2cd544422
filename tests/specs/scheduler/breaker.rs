//! Circuit breaking for repeatedly failing modules.

use crate::prelude::*;
use mh_core::{DataStrategy, ExecutionPolicy};
use mh_host::BreakerState;
use std::time::Duration;

/// A module that throws on every tick: three failures open the breaker,
/// ~5 s of simulated wall time pass with no dispatches, then exactly one
/// half-open trial runs and re-opens the circuit.
#[tokio::test]
async fn breaker_opens_cools_down_and_retries_once() {
    let (mut kernel, clock) = kernel();
    kernel
        .register_module(
            AlwaysFails::new("crasher"),
            ExecutionPolicy::frame_synced(DataStrategy::Replica)
                .with_failure_threshold(3)
                .with_reset_timeout_ms(5000),
        )
        .unwrap();
    kernel.initialize().unwrap();

    // three consecutive frames, three failures
    run_frames(&mut kernel, &clock, 3).await;
    let stats = kernel.stats();
    assert_eq!(stats.modules[0].dispatches, 3);
    assert_eq!(stats.modules[0].failures, 3);
    assert_eq!(stats.modules[0].breaker, BreakerState::Open);

    // two simulated seconds of frames: open circuit, zero dispatches
    run_frames(&mut kernel, &clock, 120).await;
    assert_eq!(kernel.stats().modules[0].dispatches, 3);

    // jump past the cooldown; the next frame runs the single trial
    clock.advance(Duration::from_millis(5000));
    run_frames(&mut kernel, &clock, 1).await;
    let stats = kernel.stats();
    assert_eq!(stats.modules[0].dispatches, 4, "one half-open trial");
    assert_eq!(stats.modules[0].failures, 4);
    assert_eq!(
        stats.modules[0].breaker,
        BreakerState::Open,
        "failed trial re-opens the circuit"
    );

    // and the second cooldown behaves like the first
    run_frames(&mut kernel, &clock, 60).await;
    assert_eq!(kernel.stats().modules[0].dispatches, 4);

    // the whole story is visible through the diagnostics export
    let json = serde_json::to_value(kernel.stats()).unwrap();
    assert_eq!(json["modules"][0]["breaker"], "open");
    assert_eq!(json["modules"][0]["failures"], 4);
}

/// A module that recovers closes the breaker again on its trial run.
#[tokio::test]
async fn successful_trial_closes_the_circuit() {
    use async_trait::async_trait;
    use mh_host::{Module, ModuleError, TickContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyThenFine {
        failures_left: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Module for FlakyThenFine {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn tick(&self, _ctx: &mut TickContext) -> Result<(), ModuleError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(ModuleError::msg("transient fault"));
            }
            Ok(())
        }
    }

    let (mut kernel, clock) = kernel();
    kernel
        .register_module(
            FlakyThenFine {
                failures_left: Arc::new(AtomicUsize::new(3)),
            },
            ExecutionPolicy::frame_synced(DataStrategy::Replica)
                .with_failure_threshold(3)
                .with_reset_timeout_ms(1000),
        )
        .unwrap();
    kernel.initialize().unwrap();

    run_frames(&mut kernel, &clock, 3).await;
    assert_eq!(kernel.stats().modules[0].breaker, BreakerState::Open);

    clock.advance(Duration::from_millis(1000));
    run_frames(&mut kernel, &clock, 1).await;
    assert_eq!(
        kernel.stats().modules[0].breaker,
        BreakerState::Closed,
        "successful trial closes the circuit"
    );

    run_frames(&mut kernel, &clock, 5).await;
    let stats = kernel.stats();
    assert_eq!(stats.modules[0].breaker, BreakerState::Closed);
    assert!(stats.modules[0].completions >= 5, "back to normal dispatching");
}
