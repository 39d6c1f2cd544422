// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The module scheduler.
//!
//! Each frame the kernel accumulates dt, harvests finished tasks (playing
//! their command buffers into the live world in registration order),
//! drives every provider's sync point, decides which modules to dispatch
//! (reactive triggers override timers), awaits frame-synced tasks, and
//! advances the global tick. A module has at most one in-flight task; a
//! timed-out task parks as a zombie that blocks redispatch until it
//! finishes on its own.

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::module::{Module, ModuleError, TickContext};
use crate::provider::{ReplicaProvider, SnapshotProvider, ViewProvider};
use crate::stats::{KernelStats, ModuleStats};
use indexmap::IndexMap;
use mh_core::{
    Clock, ComponentMask, DataStrategy, EventMask, ExecutionPolicy, ModuleId, PolicyKey, RunMode,
    SystemClock,
};
use mh_world::{Schema, SnapshotPool, Store, WorldView};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};

/// Slack for float accumulation: six frames of 1/60 s must tick a 10 Hz
/// timer even when the sum lands at 0.0999999.
const TIMER_EPSILON: f32 = 1e-4;

type TaskOutput = (Result<(), ModuleError>, TickContext);

enum TaskState {
    Idle,
    Running {
        handle: JoinHandle<TaskOutput>,
        started: Instant,
        /// The accumulated dt handed to the tick; subtracted back out on
        /// a successful harvest so the cadence holds.
        consumed_dt: f32,
    },
    /// Timed out; still running in the background. The result will be
    /// discarded, and the module is not redispatched until it finishes.
    Zombie { handle: JoinHandle<TaskOutput> },
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    dispatches: u64,
    completions: u64,
    failures: u64,
    timeouts: u64,
}

struct ModuleEntry {
    id: ModuleId,
    module: Arc<dyn Module>,
    policy: ExecutionPolicy,
    /// Index into the kernel's provider slots; `None` for Direct.
    provider: Option<usize>,
    explicit_provider: Option<Arc<dyn ViewProvider>>,
    last_run_tick: u64,
    accumulated_dt: f32,
    task: TaskState,
    breaker: CircuitBreaker,
    stats: Counters,
}

struct ProviderSlot {
    provider: Arc<dyn ViewProvider>,
    members: Vec<usize>,
}

pub struct Kernel<C: Clock = SystemClock> {
    schema: Arc<Schema>,
    live: Arc<Mutex<Store>>,
    pool: Arc<SnapshotPool>,
    clock: C,
    config: HostConfig,
    modules: Vec<ModuleEntry>,
    providers: Vec<ProviderSlot>,
    /// Event types published after the dispatch snapshot of the previous
    /// frame (inline synchronous ticks, frame-synced harvests). The swap
    /// clears the bus's active set, so these carry into the next frame's
    /// wake decision.
    pending_events: EventMask,
    initialized: bool,
}

impl Kernel<SystemClock> {
    /// Production kernel with default configuration.
    pub fn with_defaults(schema: Arc<Schema>) -> Self {
        Self::new(schema, SystemClock, HostConfig::default())
    }
}

impl<C: Clock> Kernel<C> {
    pub fn new(schema: Arc<Schema>, clock: C, config: HostConfig) -> Self {
        let live = Arc::new(Mutex::new(Store::new(schema.clone())));
        let pool = Arc::new(SnapshotPool::new(schema.clone(), config.snapshot_pool_cap));
        Self {
            schema,
            live,
            pool,
            clock,
            config,
            modules: Vec::new(),
            providers: Vec::new(),
            pending_events: EventMask::new(),
            initialized: false,
        }
    }

    /// The live world. Written by the kernel thread only: setup code
    /// before the loop starts, command playback during harvest.
    pub fn live_world(&self) -> Arc<Mutex<Store>> {
        self.live.clone()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Current global tick of the live world.
    pub fn tick(&self) -> u64 {
        self.live.lock().tick()
    }

    pub fn snapshot_pool(&self) -> &Arc<SnapshotPool> {
        &self.pool
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Record a module and its policy, in insertion order. Order matters:
    /// it fixes harvest and command-playback order for the session.
    pub fn register_module(
        &mut self,
        module: impl Module,
        policy: ExecutionPolicy,
    ) -> Result<(), HostError> {
        self.register_entry(Arc::new(module), policy, None)
    }

    /// Register with an explicit provider, bypassing convoy grouping.
    pub fn register_module_with_provider(
        &mut self,
        module: impl Module,
        policy: ExecutionPolicy,
        provider: Arc<dyn ViewProvider>,
    ) -> Result<(), HostError> {
        self.register_entry(Arc::new(module), policy, Some(provider))
    }

    fn register_entry(
        &mut self,
        module: Arc<dyn Module>,
        policy: ExecutionPolicy,
        explicit_provider: Option<Arc<dyn ViewProvider>>,
    ) -> Result<(), HostError> {
        if self.initialized {
            return Err(HostError::AlreadyInitialized);
        }
        let id = ModuleId::new(module.name());
        if self.modules.iter().any(|m| m.id == id) {
            return Err(HostError::DuplicateModule(id));
        }
        let breaker = CircuitBreaker::new(policy.failure_threshold, policy.reset_timeout());
        self.modules.push(ModuleEntry {
            id,
            module,
            policy,
            provider: None,
            explicit_provider,
            last_run_tick: 0,
            accumulated_dt: 0.0,
            task: TaskState::Idle,
            breaker,
            stats: Counters::default(),
        });
        Ok(())
    }

    /// Validate every policy, group modules into convoys, and build
    /// providers. Configuration errors here are fatal to the host.
    pub fn initialize(&mut self) -> Result<(), HostError> {
        if self.initialized {
            return Err(HostError::AlreadyInitialized);
        }

        let mut groups: IndexMap<PolicyKey, Vec<usize>> = IndexMap::new();
        for (idx, entry) in self.modules.iter().enumerate() {
            entry
                .policy
                .validate()
                .map_err(|source| HostError::InvalidPolicy {
                    module: entry.id.clone(),
                    source,
                })?;
            if entry.explicit_provider.is_some() {
                continue;
            }
            if entry.policy.strategy != DataStrategy::Direct {
                groups.entry(entry.policy.key()).or_default().push(idx);
            }
        }

        for idx in 0..self.modules.len() {
            if let Some(provider) = self.modules[idx].explicit_provider.take() {
                let slot = self.providers.len();
                self.modules[idx].provider = Some(slot);
                self.providers.push(ProviderSlot {
                    provider,
                    members: vec![idx],
                });
            }
        }

        for (key, members) in groups {
            let sync_mask = members.iter().fold(ComponentMask::new(), |mask, &i| {
                mask.union(&self.modules[i].policy.components)
            });
            let provider: Arc<dyn ViewProvider> = match key.strategy {
                DataStrategy::Replica => Arc::new(ReplicaProvider::new(
                    self.live.clone(),
                    self.schema.clone(),
                )),
                DataStrategy::Snapshot => Arc::new(SnapshotProvider::new(
                    self.live.clone(),
                    self.pool.clone(),
                    self.schema.clone(),
                    sync_mask,
                )),
                // filtered out above; Direct modules read the live world
                // through a per-dispatch view with no provider state
                DataStrategy::Direct => continue,
            };
            let slot = self.providers.len();
            for &i in &members {
                self.modules[i].provider = Some(slot);
            }
            self.providers.push(ProviderSlot { provider, members });
        }

        self.pool.warm(self.config.snapshot_warm);
        self.initialized = true;
        tracing::info!(
            modules = self.modules.len(),
            providers = self.providers.len(),
            "module host initialized"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Frame loop
    // ---------------------------------------------------------------

    /// Advance one frame: accumulate, harvest, sync providers, dispatch,
    /// await frame-synced tasks, advance the tick.
    pub async fn update(&mut self, dt: f32) -> Result<(), HostError> {
        if !self.initialized {
            return Err(HostError::NotInitialized);
        }
        let now = self.clock.now();

        for entry in &mut self.modules {
            entry.accumulated_dt += dt;
        }

        self.harvest(now).await?;
        self.sync_providers()?;
        let seen_events = self.dispatch(now).await?;
        self.frame_synced_barrier(now).await?;

        // publishes that landed after the dispatch snapshot would vanish
        // in the swap; carry them into the next frame's wake decision
        let mut live = self.live.lock();
        self.pending_events = live.bus().active_events().difference(&seen_events);
        live.advance_frame(dt);
        Ok(())
    }

    async fn harvest(&mut self, now: Instant) -> Result<(), HostError> {
        for idx in 0..self.modules.len() {
            let task = std::mem::replace(&mut self.modules[idx].task, TaskState::Idle);
            match task {
                TaskState::Idle => {}
                TaskState::Zombie { handle } => {
                    if handle.is_finished() {
                        // late completion of a timed-out tick; the result
                        // is discarded and the module is dispatchable again
                        let _ = handle.await;
                        tracing::debug!(
                            module = %self.modules[idx].id,
                            "zombie task finished; result discarded"
                        );
                    } else {
                        self.modules[idx].task = TaskState::Zombie { handle };
                    }
                }
                TaskState::Running {
                    handle,
                    started,
                    consumed_dt,
                } => {
                    if handle.is_finished() {
                        let outcome = handle.await;
                        self.finish_task(idx, outcome, consumed_dt, now)?;
                    } else if now.duration_since(started)
                        >= self.modules[idx].policy.runtime_budget()
                    {
                        self.park_as_zombie(idx, handle, now);
                    } else {
                        self.modules[idx].task = TaskState::Running {
                            handle,
                            started,
                            consumed_dt,
                        };
                    }
                }
            }
        }
        Ok(())
    }

    fn park_as_zombie(&mut self, idx: usize, handle: JoinHandle<TaskOutput>, now: Instant) {
        let entry = &mut self.modules[idx];
        let was = entry.breaker.state();
        entry.breaker.record_failure(now);
        entry.stats.failures += 1;
        entry.stats.timeouts += 1;
        tracing::warn!(
            module = %entry.id,
            budget_ms = entry.policy.max_runtime_ms,
            "module tick exceeded its budget; continuing as zombie, result will be discarded"
        );
        log_breaker_transition(&entry.id, was, entry.breaker.state());
        entry.task = TaskState::Zombie { handle };
    }

    fn finish_task(
        &mut self,
        idx: usize,
        outcome: Result<TaskOutput, JoinError>,
        consumed_dt: f32,
        now: Instant,
    ) -> Result<(), HostError> {
        match outcome {
            Ok((Ok(()), ctx)) => self.harvest_success(idx, ctx, consumed_dt),
            Ok((Err(err), ctx)) => {
                let (view, discarded) = ctx.into_parts();
                drop(discarded);
                self.release_view(idx, view);
                self.record_failure(idx, now, &err.to_string());
                Ok(())
            }
            Err(join_error) => {
                // the task's view and buffer were dropped with the task
                let cause = if join_error.is_panic() {
                    "tick panicked"
                } else {
                    "task cancelled"
                };
                self.record_failure(idx, now, cause);
                Ok(())
            }
        }
    }

    fn harvest_success(
        &mut self,
        idx: usize,
        ctx: TickContext,
        consumed_dt: f32,
    ) -> Result<(), HostError> {
        let (view, commands) = ctx.into_parts();
        let recorded = commands.len();
        let playback = {
            let mut live = self.live.lock();
            commands.play_back(&mut live)?
        };
        self.release_view(idx, view);

        let entry = &mut self.modules[idx];
        let was = entry.breaker.state();
        entry.breaker.record_success();
        if was != BreakerState::Closed {
            tracing::info!(module = %entry.id, "circuit closed after successful run");
        }
        entry.stats.completions += 1;
        entry.accumulated_dt = (entry.accumulated_dt - consumed_dt).max(0.0);
        tracing::debug!(
            module = %entry.id,
            commands = recorded,
            mutated = playback.mutated,
            created = playback.created,
            destroyed = playback.destroyed,
            "tick harvested"
        );
        Ok(())
    }

    fn record_failure(&mut self, idx: usize, now: Instant, cause: &str) {
        let entry = &mut self.modules[idx];
        let was = entry.breaker.state();
        entry.breaker.record_failure(now);
        entry.stats.failures += 1;
        tracing::warn!(module = %entry.id, cause, "module tick failed; commands discarded");
        log_breaker_transition(&entry.id, was, entry.breaker.state());
    }

    fn release_view(&self, idx: usize, view: WorldView) {
        match self.modules[idx].provider {
            Some(p) => {
                if let Some(slot) = self.providers.get(p) {
                    slot.provider.release(view);
                }
            }
            None => drop(view),
        }
    }

    fn sync_providers(&self) -> Result<(), HostError> {
        for slot in &self.providers {
            let floor = slot
                .members
                .iter()
                .map(|&i| self.modules[i].last_run_tick)
                .min()
                .unwrap_or(0);
            slot.provider.update(floor)?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, now: Instant) -> Result<EventMask, HostError> {
        let (bus_events, current_tick) = {
            let live = self.live.lock();
            (live.bus().active_events(), live.tick())
        };
        let active_events = bus_events.union(&self.pending_events);
        self.pending_events = EventMask::new();

        for idx in 0..self.modules.len() {
            if !matches!(self.modules[idx].task, TaskState::Idle) {
                continue;
            }

            {
                let entry = &mut self.modules[idx];
                let was = entry.breaker.state();
                if !entry.breaker.allow(now) {
                    continue;
                }
                if was == BreakerState::Open {
                    tracing::info!(module = %entry.id, "circuit half-open; allowing a trial run");
                }
            }

            let (should_run, reactive) = {
                let entry = &self.modules[idx];
                let by_event = entry.policy.watch_events.intersects(&active_events);
                let by_component = !entry.policy.watch_components.is_empty()
                    && self.live.lock().components_changed_since(
                        &entry.policy.watch_components,
                        entry.last_run_tick,
                    );
                let by_timer =
                    entry.accumulated_dt * entry.policy.frequency_hz as f32 >= 1.0 - TIMER_EPSILON;
                (by_event || by_component || by_timer, by_event || by_component)
            };
            if !should_run {
                continue;
            }

            let view = match self.modules[idx].provider {
                None => WorldView::shared(self.live.clone()),
                Some(p) => {
                    let slot = self.providers.get(p).ok_or_else(|| {
                        HostError::InvariantViolation(format!("provider slot {} missing", p))
                    })?;
                    slot.provider.acquire(
                        &self.modules[idx].policy.components,
                        self.modules[idx].last_run_tick,
                    )?
                }
            };

            let dt = self.modules[idx].accumulated_dt;
            let mode = self.modules[idx].policy.mode;
            let module = {
                let entry = &mut self.modules[idx];
                entry.last_run_tick = current_tick;
                entry.stats.dispatches += 1;
                tracing::debug!(module = %entry.id, dt, reactive, "dispatching module tick");
                entry.module.clone()
            };

            match mode {
                RunMode::Synchronous => {
                    let mut ctx = TickContext::new(view, dt);
                    let result = module.tick(&mut ctx).await;
                    match result {
                        Ok(()) => self.harvest_success(idx, ctx, dt)?,
                        Err(err) => {
                            drop(ctx);
                            self.record_failure(idx, now, &err.to_string());
                        }
                    }
                }
                RunMode::FrameSynced | RunMode::Asynchronous => {
                    let handle = tokio::spawn(async move {
                        let mut ctx = TickContext::new(view, dt);
                        let result = module.tick(&mut ctx).await;
                        (result, ctx)
                    });
                    self.modules[idx].task = TaskState::Running {
                        handle,
                        started: now,
                        consumed_dt: dt,
                    };
                }
            }
        }
        Ok(bus_events)
    }

    /// Await every frame-synced task dispatched this frame and harvest it
    /// immediately; over-budget tasks park as zombies.
    async fn frame_synced_barrier(&mut self, now: Instant) -> Result<(), HostError> {
        for idx in 0..self.modules.len() {
            if self.modules[idx].policy.mode != RunMode::FrameSynced {
                continue;
            }
            match std::mem::replace(&mut self.modules[idx].task, TaskState::Idle) {
                TaskState::Running {
                    mut handle,
                    consumed_dt,
                    ..
                } => {
                    let budget = self.modules[idx].policy.runtime_budget()
                        + std::time::Duration::from_millis(self.config.frame_synced_slack_ms);
                    match tokio::time::timeout(budget, &mut handle).await {
                        Ok(outcome) => self.finish_task(idx, outcome, consumed_dt, now)?,
                        Err(_) => self.park_as_zombie(idx, handle, now),
                    }
                }
                other => self.modules[idx].task = other,
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    pub fn stats(&self) -> KernelStats {
        KernelStats {
            tick: self.tick(),
            modules: self
                .modules
                .iter()
                .map(|entry| ModuleStats {
                    module: entry.id.clone(),
                    dispatches: entry.stats.dispatches,
                    completions: entry.stats.completions,
                    failures: entry.stats.failures,
                    timeouts: entry.stats.timeouts,
                    breaker: entry.breaker.state(),
                    last_run_tick: entry.last_run_tick,
                    zombie: matches!(entry.task, TaskState::Zombie { .. }),
                })
                .collect(),
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Distinct provider instances built at initialize. Direct modules
    /// have none.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn log_breaker_transition(id: &ModuleId, was: BreakerState, is: BreakerState) {
    if was != is && is == BreakerState::Open {
        tracing::warn!(module = %id, "circuit opened; module will be skipped until the cooldown elapses");
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
