// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! World-view providers.
//!
//! A provider hands modules a read-only view of the world and hides
//! whether that view is the live store, a long-lived replica synced every
//! frame, or a pooled snapshot filtered by component mask. The kernel
//! calls `update` once per provider at the frame's sync point and
//! `acquire`/`release` around each dispatch.

use mh_core::ComponentMask;
use mh_world::{EventAccumulator, Schema, SnapshotLease, SnapshotPool, Store, WorldError, WorldView};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub trait ViewProvider: Send + Sync {
    /// Per-frame sync point. `observed_floor` is the minimum last-seen
    /// tick across this provider's consumers, used to bound event
    /// history.
    fn update(&self, observed_floor: u64) -> Result<(), WorldError>;

    /// Lease a view for one module tick.
    fn acquire(&self, mask: &ComponentMask, last_seen: u64) -> Result<WorldView, WorldError>;

    /// Return a leased view. Views release by drop; this hook exists for
    /// providers that track holders explicitly.
    fn release(&self, view: WorldView) {
        drop(view);
    }
}

/// The live world itself. No isolation from mutations; handed only to
/// synchronous modules running inline on the kernel thread.
pub struct DirectProvider {
    live: Arc<Mutex<Store>>,
}

impl DirectProvider {
    pub fn new(live: Arc<Mutex<Store>>) -> Self {
        Self { live }
    }
}

impl ViewProvider for DirectProvider {
    fn update(&self, _observed_floor: u64) -> Result<(), WorldError> {
        Ok(())
    }

    fn acquire(&self, _mask: &ComponentMask, _last_seen: u64) -> Result<WorldView, WorldError> {
        Ok(WorldView::shared(self.live.clone()))
    }
}

/// One long-lived replica, fully synced from the live world at every
/// frame's sync point, with the closed frame's events flushed in.
/// Optimized for frequent readers that need all of the state.
pub struct ReplicaProvider {
    live: Arc<Mutex<Store>>,
    replica: Arc<Mutex<Store>>,
    accumulator: Mutex<EventAccumulator>,
    /// Highest frame whose events the replica has observed.
    flushed: AtomicU64,
}

impl ReplicaProvider {
    pub fn new(live: Arc<Mutex<Store>>, schema: Arc<Schema>) -> Self {
        let replica = Arc::new(Mutex::new(Store::new(schema.clone())));
        Self {
            live,
            replica,
            accumulator: Mutex::new(EventAccumulator::new(schema)),
            flushed: AtomicU64::new(0),
        }
    }
}

impl ViewProvider for ReplicaProvider {
    fn update(&self, _observed_floor: u64) -> Result<(), WorldError> {
        let live = self.live.lock();
        let mut replica = self.replica.lock();
        let mut accumulator = self.accumulator.lock();

        // the frame that just closed sits in the live bus's retired
        // buffers
        let closed_frame = live.tick().saturating_sub(1);
        accumulator.capture_frame(live.bus(), closed_frame)?;

        replica.sync_from(&live, None)?;

        let last_seen = self.flushed.load(Ordering::Relaxed);
        replica.bus_mut().soft_clear();
        let high = accumulator.flush_to(replica.bus_mut(), last_seen)?;
        self.flushed.store(high, Ordering::Relaxed);

        // single consumer: everything flushed can be reclaimed
        accumulator.reclaim(high);
        Ok(())
    }

    fn acquire(&self, _mask: &ComponentMask, _last_seen: u64) -> Result<WorldView, WorldError> {
        Ok(WorldView::shared(self.replica.clone()))
    }
}

struct SharedFrame {
    tick: u64,
    lease: Weak<SnapshotLease>,
}

/// Pooled, mask-filtered snapshots, shared across a convoy.
///
/// The first acquirer of a frame rents a store from the pool, syncs it
/// under the provider lock with the convoy's union mask, and flushes
/// accumulated events; later acquirers in the same frame share the lease.
/// The store returns to the pool when the last holder drops.
pub struct SnapshotProvider {
    live: Arc<Mutex<Store>>,
    pool: Arc<SnapshotPool>,
    /// Union of the convoy members' component masks.
    sync_mask: ComponentMask,
    accumulator: Mutex<EventAccumulator>,
    shared: Mutex<Option<SharedFrame>>,
}

impl SnapshotProvider {
    pub fn new(
        live: Arc<Mutex<Store>>,
        pool: Arc<SnapshotPool>,
        schema: Arc<Schema>,
        sync_mask: ComponentMask,
    ) -> Self {
        Self {
            live,
            pool,
            sync_mask,
            accumulator: Mutex::new(EventAccumulator::new(schema)),
            shared: Mutex::new(None),
        }
    }

    pub fn sync_mask(&self) -> &ComponentMask {
        &self.sync_mask
    }
}

impl ViewProvider for SnapshotProvider {
    fn update(&self, observed_floor: u64) -> Result<(), WorldError> {
        // no store sync here; snapshots are rented on acquire. The frame's
        // retired events are still captured so consumers slower than the
        // frame rate observe every frame.
        self.shared.lock().take();

        let live = self.live.lock();
        let closed_frame = live.tick().saturating_sub(1);
        let mut accumulator = self.accumulator.lock();
        accumulator.capture_frame(live.bus(), closed_frame)?;
        accumulator.reclaim(observed_floor);
        Ok(())
    }

    fn acquire(&self, _mask: &ComponentMask, last_seen: u64) -> Result<WorldView, WorldError> {
        let mut shared = self.shared.lock();

        let live_tick = self.live.lock().tick();
        if let Some(frame) = shared.as_ref() {
            if frame.tick == live_tick {
                if let Some(lease) = frame.lease.upgrade() {
                    return Ok(WorldView::snapshot(lease));
                }
            }
        }

        // first acquirer this frame performs the sync under the provider
        // lock
        let mut lease = self.pool.lease();
        {
            let live = self.live.lock();
            lease.store_mut().sync_from(&live, Some(&self.sync_mask))?;
        }
        let mut accumulator = self.accumulator.lock();
        accumulator.flush_to(lease.store_mut().bus_mut(), last_seen)?;
        drop(accumulator);

        let lease = Arc::new(lease);
        *shared = Some(SharedFrame {
            tick: live_tick,
            lease: Arc::downgrade(&lease),
        });
        Ok(WorldView::snapshot(lease))
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
