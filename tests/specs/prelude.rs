//! Shared fixtures for the behavioral scenarios.

#![allow(dead_code)]

use async_trait::async_trait;
use mh_core::{FakeClock, LifecycleState};
use mh_host::{HostConfig, Kernel, Module, ModuleError, TickContext};
use mh_world::{Schema, Store};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FRAME: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Team {
    pub id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub radius: f32,
}

pub fn schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    schema.register_component::<Position>().unwrap();
    schema.register_component::<Health>().unwrap();
    schema.register_component::<Team>().unwrap();
    schema.register_component::<Velocity>().unwrap();
    schema.register_event::<Explosion>().unwrap();
    Arc::new(schema)
}

pub fn kernel() -> (Kernel<FakeClock>, FakeClock) {
    kernel_with(HostConfig::default())
}

pub fn kernel_with(config: HostConfig) -> (Kernel<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (Kernel::new(schema(), clock.clone(), config), clock)
}

/// Spawn an active entity with a position.
pub fn spawn_unit(store: &mut Store, x: f32, y: f32) -> mh_core::Entity {
    let e = store.create_entity();
    store.set_component(e, Position { x, y }).unwrap();
    store.set_lifecycle(e, LifecycleState::Active).unwrap();
    e
}

/// Run `frames` kernel frames, advancing the fake clock in step and
/// letting spawned tasks settle between frames.
pub async fn run_frames(kernel: &mut Kernel<FakeClock>, clock: &FakeClock, frames: usize) {
    for _ in 0..frames {
        kernel.update(FRAME).await.unwrap();
        clock.advance(Duration::from_secs_f32(FRAME));
        settle().await;
    }
}

/// Let spawned tasks run to completion on the current-thread test runtime.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Module that counts runs and records each dispatch's dt and view tick.
pub struct Probe {
    name: String,
    pub runs: Arc<AtomicUsize>,
    pub dts: Arc<Mutex<Vec<f32>>>,
    pub ticks: Arc<Mutex<Vec<u64>>>,
}

impl Probe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            runs: Arc::new(AtomicUsize::new(0)),
            dts: Arc::new(Mutex::new(Vec::new())),
            ticks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Module for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, ctx: &mut TickContext) -> Result<(), ModuleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.dts.lock().push(ctx.dt());
        self.ticks.lock().push(ctx.view().tick());
        Ok(())
    }
}

/// Module that fails every run.
pub struct AlwaysFails {
    name: String,
}

impl AlwaysFails {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Module for AlwaysFails {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, _ctx: &mut TickContext) -> Result<(), ModuleError> {
        Err(ModuleError::msg("scripted failure"))
    }
}
