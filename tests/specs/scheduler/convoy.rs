//! Convoy grouping: modules with identical policies share one snapshot.

use crate::prelude::*;
use async_trait::async_trait;
use mh_core::{ComponentMask, DataStrategy, ExecutionPolicy};
use mh_host::{HostConfig, Module, ModuleError, TickContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records what a convoy member could read from its shared snapshot.
struct ConvoyMember {
    name: String,
    pub runs: Arc<AtomicUsize>,
    pub saw: Arc<Mutex<Vec<(Option<Position>, Option<Health>, Option<Team>, Option<Velocity>)>>>,
    target: Arc<Mutex<Option<mh_core::Entity>>>,
}

impl ConvoyMember {
    fn new(name: &str, target: Arc<Mutex<Option<mh_core::Entity>>>) -> Self {
        Self {
            name: name.to_string(),
            runs: Arc::new(AtomicUsize::new(0)),
            saw: Arc::new(Mutex::new(Vec::new())),
            target,
        }
    }
}

#[async_trait]
impl Module for ConvoyMember {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, ctx: &mut TickContext) -> Result<(), ModuleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = *self.target.lock() {
            self.saw.lock().push((
                ctx.view().read::<Position>(e),
                ctx.view().read::<Health>(e),
                ctx.view().read::<Team>(e),
                ctx.view().read::<Velocity>(e),
            ));
        }
        Ok(())
    }
}

/// Three modules with the same (mode, strategy, frequency) and masks
/// {Position}, {Position, Health}, {Team}: one pool rent per dispatch
/// frame, a union sync mask, one hand-back when the last release happens.
#[tokio::test]
async fn convoy_shares_one_snapshot_per_frame() {
    let (mut kernel, clock) = kernel_with(HostConfig {
        snapshot_warm: 0,
        ..HostConfig::default()
    });
    let schema = kernel.schema().clone();
    let pos = schema.component_id::<Position>().unwrap();
    let health = schema.component_id::<Health>().unwrap();
    let team = schema.component_id::<Team>().unwrap();

    let target = Arc::new(Mutex::new(None));
    let policy = |mask: ComponentMask| {
        ExecutionPolicy::asynchronous(DataStrategy::Snapshot)
            .at_hz(10)
            .with_components(mask)
    };

    let c1 = ConvoyMember::new("c1", target.clone());
    let c2 = ConvoyMember::new("c2", target.clone());
    let c3 = ConvoyMember::new("c3", target.clone());
    let (runs1, saw1) = (c1.runs.clone(), c1.saw.clone());
    let (runs2, runs3) = (c2.runs.clone(), c3.runs.clone());

    kernel
        .register_module(c1, policy(ComponentMask::new().with(pos)))
        .unwrap();
    kernel
        .register_module(c2, policy(ComponentMask::new().with(pos).with(health)))
        .unwrap();
    kernel
        .register_module(c3, policy(ComponentMask::new().with(team)))
        .unwrap();
    kernel.initialize().unwrap();
    assert_eq!(kernel.provider_count(), 1, "identical keys share a provider");

    {
        let live = kernel.live_world();
        let mut live = live.lock();
        let e = spawn_unit(&mut live, 4.0, 0.0);
        live.set_component(e, Health { hp: 11 }).unwrap();
        live.set_component(e, Team { id: 3 }).unwrap();
        live.set_component(e, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
        *target.lock() = Some(e);
    }

    // frame 6 is the 10 Hz dispatch frame
    run_frames(&mut kernel, &clock, 8).await;

    assert_eq!(runs1.load(Ordering::SeqCst), 1);
    assert_eq!(runs2.load(Ordering::SeqCst), 1);
    assert_eq!(runs3.load(Ordering::SeqCst), 1);

    let pool = kernel.snapshot_pool();
    assert_eq!(pool.constructed(), 1, "exactly one rent for all three");
    assert_eq!(pool.idle(), 1, "handed back after the last release");

    // the sync mask is the union {Position, Health, Team}: a member can
    // read outside its own declared mask, but Velocity stayed behind
    let saw = saw1.lock();
    let (p, h, t, v) = &saw[0];
    assert_eq!(*p, Some(Position { x: 4.0, y: 0.0 }));
    assert_eq!(*h, Some(Health { hp: 11 }));
    assert_eq!(*t, Some(Team { id: 3 }));
    assert_eq!(*v, None, "outside the union mask");
}

/// Masks differing only in components still convoy; differing frequency
/// does not.
#[tokio::test]
async fn frequency_splits_convoys() {
    let (mut kernel, _clock) = kernel();
    let ten = ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(10);
    let twenty = ExecutionPolicy::asynchronous(DataStrategy::Snapshot).at_hz(20);

    kernel
        .register_module(Probe::new("a"), ten.clone())
        .unwrap();
    kernel
        .register_module(Probe::new("b"), ten)
        .unwrap();
    kernel
        .register_module(Probe::new("c"), twenty)
        .unwrap();
    kernel.initialize().unwrap();

    assert_eq!(kernel.provider_count(), 2);
}
