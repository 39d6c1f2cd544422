// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution policies: how a module is scheduled and which view it receives.

use crate::mask::{ComponentMask, EventMask};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default timeout budget for one module tick.
pub const DEFAULT_MAX_RUNTIME_MS: u64 = 100;
/// Default consecutive failures before the circuit breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
/// Default cooldown before an open breaker allows a trial run.
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 5000;

/// Where a module's tick executes relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Inline on the kernel thread; blocks the frame.
    Synchronous,
    /// On a worker, awaited before the frame ends.
    FrameSynced,
    /// On a worker, not awaited; may span frames.
    Asynchronous,
}

/// Which view of the world a module's tick reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStrategy {
    /// The live world itself. Synchronous modules only.
    Direct,
    /// A persistent replica synced every frame.
    Replica,
    /// A pooled replica filtered by component mask.
    Snapshot,
}

/// Policy validation failures, reported at host initialization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("synchronous modules must use the direct strategy, got {0:?}")]
    SynchronousRequiresDirect(DataStrategy),
    #[error("the direct strategy is only available to synchronous modules, got {0:?}")]
    DirectRequiresSynchronous(RunMode),
    #[error("frequency must be within 1..=60 Hz, got {0}")]
    FrequencyOutOfRange(u32),
}

/// Declarative configuration of how a module is scheduled and what it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub mode: RunMode,
    pub strategy: DataStrategy,
    /// Target dispatch rate; reactive triggers override the timer.
    pub frequency_hz: u32,
    /// Wall-clock budget for one tick before it counts as a timeout.
    pub max_runtime_ms: u64,
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// Cooldown before an open breaker allows a trial run.
    pub reset_timeout_ms: u64,
    /// Component types the module reads; drives filtered snapshot sync.
    pub components: ComponentMask,
    /// Event types the module consumes from its view.
    pub events: EventMask,
    /// Component types whose change wakes the module ahead of its timer.
    pub watch_components: ComponentMask,
    /// Event types whose publish wakes the module ahead of its timer.
    pub watch_events: EventMask,
}

impl ExecutionPolicy {
    fn with_mode(mode: RunMode, strategy: DataStrategy) -> Self {
        Self {
            mode,
            strategy,
            frequency_hz: 60,
            max_runtime_ms: DEFAULT_MAX_RUNTIME_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            components: ComponentMask::new(),
            events: EventMask::new(),
            watch_components: ComponentMask::new(),
            watch_events: EventMask::new(),
        }
    }

    /// Inline on the kernel thread against the live world.
    pub fn synchronous() -> Self {
        Self::with_mode(RunMode::Synchronous, DataStrategy::Direct)
    }

    /// On a worker, awaited before the frame ends.
    pub fn frame_synced(strategy: DataStrategy) -> Self {
        Self::with_mode(RunMode::FrameSynced, strategy)
    }

    /// On a worker, carried across frames.
    pub fn asynchronous(strategy: DataStrategy) -> Self {
        Self::with_mode(RunMode::Asynchronous, strategy)
    }

    pub fn at_hz(mut self, frequency_hz: u32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    pub fn with_components(mut self, components: ComponentMask) -> Self {
        self.components = components;
        self
    }

    pub fn with_events(mut self, events: EventMask) -> Self {
        self.events = events;
        self
    }

    pub fn watching_components(mut self, watch: ComponentMask) -> Self {
        self.watch_components = watch;
        self
    }

    pub fn watching_events(mut self, watch: EventMask) -> Self {
        self.watch_events = watch;
        self
    }

    pub fn with_max_runtime_ms(mut self, ms: u64) -> Self {
        self.max_runtime_ms = ms;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout_ms(mut self, ms: u64) -> Self {
        self.reset_timeout_ms = ms;
        self
    }

    /// Check the mode/strategy combination and the frequency range.
    pub fn validate(&self) -> Result<(), PolicyError> {
        match (self.mode, self.strategy) {
            (RunMode::Synchronous, DataStrategy::Direct) => {}
            (RunMode::Synchronous, other) => {
                return Err(PolicyError::SynchronousRequiresDirect(other));
            }
            (mode, DataStrategy::Direct) => {
                return Err(PolicyError::DirectRequiresSynchronous(mode));
            }
            _ => {}
        }
        if self.frequency_hz == 0 || self.frequency_hz > 60 {
            return Err(PolicyError::FrequencyOutOfRange(self.frequency_hz));
        }
        Ok(())
    }

    /// Grouping key for provider sharing (convoys).
    pub fn key(&self) -> PolicyKey {
        PolicyKey {
            mode: self.mode,
            strategy: self.strategy,
            frequency_hz: self.frequency_hz,
        }
    }

    pub fn runtime_budget(&self) -> Duration {
        Duration::from_millis(self.max_runtime_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Modules sharing a key share one provider instance (and one snapshot
/// sync per dispatch frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyKey {
    pub mode: RunMode,
    pub strategy: DataStrategy,
    pub frequency_hz: u32,
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
