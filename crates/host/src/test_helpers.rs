// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the host crate.

use crate::module::{Module, ModuleError, TickContext};
use async_trait::async_trait;
use mh_core::{FakeClock, LifecycleState};
use mh_world::{Schema, Store};
use parking_lot::Mutex as PlMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::HostConfig;
use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Health {
    pub hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Team {
    pub id: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Explosion {
    pub radius: f32,
}

pub(crate) fn test_schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    schema.register_component::<Position>().unwrap();
    schema.register_component::<Health>().unwrap();
    schema.register_component::<Team>().unwrap();
    schema.register_event::<Explosion>().unwrap();
    Arc::new(schema)
}

pub(crate) fn test_kernel() -> (Kernel<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let kernel = Kernel::new(test_schema(), clock.clone(), HostConfig::default());
    (kernel, clock)
}

/// Spawn an active entity with a position directly on a store.
pub(crate) fn spawn_unit(store: &mut Store, x: f32, y: f32) -> mh_core::Entity {
    let e = store.create_entity();
    store.set_component(e, Position { x, y }).unwrap();
    store.set_lifecycle(e, LifecycleState::Active).unwrap();
    e
}

/// Module that counts its runs and records each dispatch dt.
pub(crate) struct CountingModule {
    name: String,
    pub runs: Arc<AtomicUsize>,
    pub dts: Arc<PlMutex<Vec<f32>>>,
}

impl CountingModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            runs: Arc::new(AtomicUsize::new(0)),
            dts: Arc::new(PlMutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Module for CountingModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, ctx: &mut TickContext) -> Result<(), ModuleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.dts.lock().push(ctx.dt());
        Ok(())
    }
}

/// Module that fails every tick.
pub(crate) struct FailingModule {
    name: String,
}

impl FailingModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, _ctx: &mut TickContext) -> Result<(), ModuleError> {
        Err(ModuleError::msg("scripted failure"))
    }
}

/// Module that waits on a notify handle before returning, for timeout and
/// zombie tests.
pub(crate) struct StallingModule {
    name: String,
    pub gate: Arc<tokio::sync::Notify>,
    pub runs: Arc<AtomicUsize>,
}

impl StallingModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            gate: Arc::new(tokio::sync::Notify::new()),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Module for StallingModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&self, _ctx: &mut TickContext) -> Result<(), ModuleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }
}

/// Let spawned tasks run to completion on the current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
