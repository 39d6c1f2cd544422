// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostics snapshots exported by the kernel.

use crate::breaker::BreakerState;
use mh_core::ModuleId;
use serde::Serialize;

/// Execution counters for one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStats {
    pub module: ModuleId,
    /// Ticks started.
    pub dispatches: u64,
    /// Ticks harvested successfully.
    pub completions: u64,
    /// Failures of any kind (errors, panics, timeouts).
    pub failures: u64,
    /// Subset of failures that were budget overruns.
    pub timeouts: u64,
    pub breaker: BreakerState,
    /// Tick of the most recent dispatch, 0 if never dispatched.
    pub last_run_tick: u64,
    /// A timed-out task is still running in the background.
    pub zombie: bool,
}

/// Kernel-wide diagnostics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct KernelStats {
    pub tick: u64,
    pub modules: Vec<ModuleStats>,
}
