// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dense type identifiers assigned at registration.

use serde::{Deserialize, Serialize};

/// Number of component or event type slots a store supports.
pub const MAX_TYPES: usize = 256;

/// Identifier for a registered component type.
///
/// Assigned densely by the schema, starting at zero, in registration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ComponentTypeId(u16);

impl ComponentTypeId {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Identifier for a registered event type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EventTypeId(u16);

impl EventTypeId {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ev{}", self.0)
    }
}
