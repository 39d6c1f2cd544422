// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only world views.
//!
//! A `WorldView` hides whether the underlying store is the live world, a
//! persistent replica (both behind a shared mutex), or a pooled snapshot
//! lease (immutable after sync, no lock on the read path). Views are cheap
//! to clone and travel into worker tasks; values are copied or `Arc`-cloned
//! out so no borrow outlives a lock.

use crate::pool::SnapshotLease;
use crate::store::Store;
use mh_core::{ComponentTypeId, Entity};
use parking_lot::Mutex;
use std::any::TypeId;
use std::sync::Arc;

#[derive(Clone)]
enum ViewInner {
    /// Live world or persistent replica.
    Shared(Arc<Mutex<Store>>),
    /// Pooled snapshot, reference-counted across a convoy.
    Snapshot(Arc<SnapshotLease>),
}

#[derive(Clone)]
pub struct WorldView {
    inner: ViewInner,
    tick: u64,
    time: f64,
}

impl WorldView {
    /// View over a mutex-guarded store (the live world or a persistent
    /// replica). Reads lock briefly per call.
    pub fn shared(store: Arc<Mutex<Store>>) -> Self {
        let (tick, time) = {
            let s = store.lock();
            (s.tick(), s.time())
        };
        Self {
            inner: ViewInner::Shared(store),
            tick,
            time,
        }
    }

    /// View over a pooled snapshot lease.
    pub fn snapshot(lease: Arc<SnapshotLease>) -> Self {
        let (tick, time) = (lease.tick(), lease.time());
        Self {
            inner: ViewInner::Snapshot(lease),
            tick,
            time,
        }
    }

    fn with_store<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        match &self.inner {
            ViewInner::Shared(store) => f(&store.lock()),
            ViewInner::Snapshot(lease) => f(lease),
        }
    }

    /// Tick of the world at acquisition time.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds at acquisition time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn alive(&self, entity: Entity) -> bool {
        self.with_store(|s| s.alive(entity))
    }

    /// Copy a blittable component out.
    pub fn read<T>(&self, entity: Entity) -> Option<T>
    where
        T: Copy + Send + Sync + 'static,
    {
        self.with_store(|s| s.get::<T>(entity))
    }

    /// Clone the shared reference to a managed component out.
    pub fn read_managed<T>(&self, entity: Entity) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.with_store(|s| s.get_managed::<T>(entity))
    }

    /// Events of type `E` visible to this view's frame, cloned out.
    pub fn events<E>(&self) -> Vec<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        self.with_store(|s| s.bus().current_events::<E>().to_vec())
    }

    /// Visit events of type `E` without cloning the collection.
    pub fn for_each_event<E>(&self, mut f: impl FnMut(&E))
    where
        E: Clone + Send + Sync + 'static,
    {
        self.with_store(|s| {
            for event in s.bus().current_events::<E>() {
                f(event);
            }
        })
    }

    pub fn query(&self) -> ViewQuery<'_> {
        ViewQuery {
            view: self,
            with_types: Vec::new(),
            with_ids: Vec::new(),
            include_constructing: false,
            include_teardown: false,
        }
    }
}

/// Deferred query configuration executed under the view's store access.
pub struct ViewQuery<'v> {
    view: &'v WorldView,
    with_types: Vec<TypeId>,
    with_ids: Vec<ComponentTypeId>,
    include_constructing: bool,
    include_teardown: bool,
}

impl ViewQuery<'_> {
    pub fn with<T: 'static>(mut self) -> Self {
        self.with_types.push(TypeId::of::<T>());
        self
    }

    pub fn with_id(mut self, id: ComponentTypeId) -> Self {
        self.with_ids.push(id);
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

    pub fn any_lifecycle(self) -> Self {
        self.include_constructing().include_teardown()
    }

    pub fn for_each(self, f: impl FnMut(Entity)) {
        let Self {
            view,
            with_types,
            with_ids,
            include_constructing,
            include_teardown,
        } = self;
        view.with_store(|store| {
            let mut builder = store.query();
            for type_id in &with_types {
                match store.schema().component_id_dyn(*type_id) {
                    Some(id) => builder = builder.with_id(id),
                    // unregistered type: nothing can match
                    None => return,
                }
            }
            for id in &with_ids {
                builder = builder.with_id(*id);
            }
            if include_constructing {
                builder = builder.include_constructing();
            }
            if include_teardown {
                builder = builder.include_teardown();
            }
            builder.for_each(f);
        });
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
#[path = "view_tests.rs"]
mod tests;
