// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity queries over a store.
//!
//! Filters by component presence (mask superset test per slot) and
//! lifecycle. Default queries see only `Active` entities; `Constructing`
//! and `TearDown` require explicit opt-in.

use crate::store::Store;
use mh_core::{ComponentMask, ComponentTypeId, Entity, LifecycleState};

pub struct QueryBuilder<'a> {
    store: &'a Store,
    with: ComponentMask,
    include_constructing: bool,
    include_teardown: bool,
    // set when a requested type is not registered; yields nothing
    impossible: bool,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            with: ComponentMask::new(),
            include_constructing: false,
            include_teardown: false,
            impossible: false,
        }
    }

    /// Require the component type `T` to be present.
    pub fn with<T: 'static>(mut self) -> Self {
        match self.store.schema().component_id::<T>() {
            Some(id) => self.with.insert(id),
            None => self.impossible = true,
        }
        self
    }

    /// Require a component by registered id.
    pub fn with_id(mut self, id: ComponentTypeId) -> Self {
        self.with.insert(id);
        self
    }

    pub fn include_constructing(mut self) -> Self {
        self.include_constructing = true;
        self
    }

    pub fn include_teardown(mut self) -> Self {
        self.include_teardown = true;
        self
    }

    /// Observe entities in every lifecycle state.
    pub fn any_lifecycle(self) -> Self {
        self.include_constructing().include_teardown()
    }

    fn matches(&self, state: LifecycleState) -> bool {
        match state {
            LifecycleState::Active => true,
            LifecycleState::Constructing => self.include_constructing,
            LifecycleState::TearDown => self.include_teardown,
        }
    }

    pub fn for_each(self, mut f: impl FnMut(Entity)) {
        if self.impossible {
            return;
        }
        for (index, slot) in self.store.entities.iter().enumerate() {
            if slot.occupied
                && self.matches(slot.state)
                && slot.components.is_superset_of(&self.with)
            {
                f(Entity::new(index as u32, slot.generation));
            }
        }
    }

    pub fn entities(self) -> Vec<Entity> {
        let mut out = Vec::new();
        self.for_each(|e| out.push(e));
        out
    }

    pub fn count(self) -> usize {
        let mut n = 0;
        self.for_each(|_| n += 1);
        n
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
