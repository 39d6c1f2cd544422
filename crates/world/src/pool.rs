// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool of reusable snapshot stores.
//!
//! A lock-free LIFO of stores built from the shared schema. Stores are
//! constructed lazily up to a soft cap, soft-cleared on hand-back, and
//! never deallocated during a session, so steady-state rents allocate
//! nothing.

use crate::schema::Schema;
use crate::store::Store;
use crossbeam_queue::SegQueue;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct SnapshotPool {
    schema: Arc<Schema>,
    stack: SegQueue<Box<Store>>,
    created: AtomicUsize,
    soft_cap: usize,
}

impl SnapshotPool {
    pub fn new(schema: Arc<Schema>, soft_cap: usize) -> Self {
        Self {
            schema,
            stack: SegQueue::new(),
            created: AtomicUsize::new(0),
            soft_cap,
        }
    }

    /// Pre-construct `count` stores so the first rents allocate nothing.
    pub fn warm(&self, count: usize) {
        for _ in 0..count {
            self.stack.push(self.construct());
        }
    }

    fn construct(&self) -> Box<Store> {
        let total = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        if total > self.soft_cap {
            tracing::warn!(
                total,
                soft_cap = self.soft_cap,
                "snapshot pool grew past its soft cap"
            );
        }
        Box::new(Store::new(self.schema.clone()))
    }

    /// Pop a clean store, constructing one if the pool is empty.
    pub fn rent(&self) -> Box<Store> {
        self.stack.pop().unwrap_or_else(|| self.construct())
    }

    /// Soft-clear and push a store back.
    pub fn hand_back(&self, mut store: Box<Store>) {
        store.soft_clear();
        self.stack.push(store);
    }

    /// Rent wrapped in a lease that hands the store back on drop.
    pub fn lease(self: &Arc<Self>) -> SnapshotLease {
        SnapshotLease {
            store: Some(self.rent()),
            pool: Arc::clone(self),
        }
    }

    /// Stores currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.stack.len()
    }

    /// Stores constructed so far.
    pub fn constructed(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// A rented snapshot store.
///
/// Share it across a convoy behind an `Arc`; the store goes back to the
/// pool when the last holder drops.
pub struct SnapshotLease {
    store: Option<Box<Store>>,
    pool: Arc<SnapshotPool>,
}

impl SnapshotLease {
    /// Mutable access for the sync performed by the first acquirer,
    /// before the lease is shared.
    pub fn store_mut(&mut self) -> &mut Store {
        // invariant: `store` is Some until drop
        match self.store.as_mut() {
            Some(store) => store,
            None => unreachable!(),
        }
    }
}

impl Deref for SnapshotLease {
    type Target = Store;

    fn deref(&self) -> &Store {
        match self.store.as_ref() {
            Some(store) => store,
            None => unreachable!(),
        }
    }
}

impl Drop for SnapshotLease {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            self.pool.hand_back(store);
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
