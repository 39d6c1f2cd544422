// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity handle type.
//!
//! An entity is addressed by an opaque (index, generation) pair. The index
//! selects a slot in a store; the generation invalidates handles that
//! outlive the entity they pointed at.

use serde::{Deserialize, Serialize};

/// Opaque handle to an entity slot in a store.
///
/// Handles are stable for as long as the generation matches the slot. After
/// the entity is destroyed and the slot reused, old handles stop resolving.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the store.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was minted with.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
