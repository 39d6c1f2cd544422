// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host configuration

use serde::{Deserialize, Serialize};

/// Tunables for the kernel, loadable from host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Snapshot stores constructed before the pool warns about growth.
    pub snapshot_pool_cap: usize,
    /// Snapshot stores pre-constructed at initialize().
    pub snapshot_warm: usize,
    /// Extra grace on top of a frame-synced module's runtime budget
    /// before the barrier declares it over budget.
    pub frame_synced_slack_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            snapshot_pool_cap: 8,
            snapshot_warm: 2,
            frame_synced_slack_ms: 5,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
