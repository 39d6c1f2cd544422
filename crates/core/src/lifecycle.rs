// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle of an entity inside a store.
///
/// Entities are created in `Constructing`, promoted to `Active`, and pass
/// through `TearDown` on their way out. Transitions happen only through
/// commands applied during harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Constructing,
    Active,
    TearDown,
}

impl LifecycleState {
    /// Whether entities in this state show up in default queries.
    ///
    /// `Constructing` and `TearDown` entities are only observed by queries
    /// that opt in explicitly.
    pub fn visible_by_default(&self) -> bool {
        matches!(self, LifecycleState::Active)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Constructing => "constructing",
            LifecycleState::Active => "active",
            LifecycleState::TearDown => "tear_down",
        };
        write!(f, "{}", s)
    }
}
