//! Snapshot pool hygiene.

use crate::prelude::*;
use mh_core::LifecycleState;
use mh_world::{SnapshotPool, Store, WorldView};
use std::sync::Arc;

/// A handed-back store rents out blank: no entities, no events, no stale
/// versions — whatever the previous lessee did to it.
#[test]
fn returned_stores_rent_out_blank() {
    let schema = schema();
    let pool = SnapshotPool::new(schema.clone(), 4);

    let mut live = Store::new(schema);
    let e = spawn_unit(&mut live, 1.0, 2.0);
    live.publish(Explosion { radius: 3.0 }).unwrap();

    // first session: rent, sync, observe, hand back
    let mut store = pool.rent();
    store.sync_from(&live, None).unwrap();
    assert!(store.alive(e));
    pool.hand_back(store);

    // second session: the store comes back with no trace of the first
    let store = pool.rent();
    assert_eq!(store.entity_count(), 0);
    assert!(!store.alive(e));
    assert_eq!(store.tick(), 1);
    assert!(store.bus().current_events::<Explosion>().is_empty());
    assert_eq!(pool.constructed(), 1, "the same store was reused");

    // and it still syncs correctly after the round trip
    let mut store = store;
    store.sync_from(&live, None).unwrap();
    assert_eq!(store.get::<Position>(e), Some(Position { x: 1.0, y: 2.0 }));
}

/// Lease clones model convoy holders: the pool sees the store again only
/// after the last clone drops, and the returned store is clean.
#[test]
fn lease_round_trip_through_shared_holders() {
    let schema = schema();
    let pool = Arc::new(SnapshotPool::new(schema.clone(), 4));

    let mut live = Store::new(schema);
    let e = live.create_entity();
    live.set_component(e, Health { hp: 1 }).unwrap();
    live.set_lifecycle(e, LifecycleState::Active).unwrap();

    let mut lease = pool.lease();
    lease.store_mut().sync_from(&live, None).unwrap();

    let shared = Arc::new(lease);
    let views: Vec<WorldView> = (0..3).map(|_| WorldView::snapshot(shared.clone())).collect();
    drop(shared);

    for view in views {
        assert_eq!(view.read::<Health>(e), Some(Health { hp: 1 }));
        assert_eq!(pool.idle(), 0, "held until the last view drops");
        drop(view);
    }
    assert_eq!(pool.idle(), 1);

    let fresh = pool.rent();
    assert_eq!(fresh.entity_count(), 0, "soft-cleared on the way back in");
}

/// Warmed pools serve their first sessions without construction.
#[test]
fn warmed_pool_construction_is_front_loaded() {
    let pool = SnapshotPool::new(schema(), 4);
    pool.warm(2);

    let a = pool.rent();
    let b = pool.rent();
    assert_eq!(pool.constructed(), 2);

    let c = pool.rent();
    assert_eq!(pool.constructed(), 3, "demand past the warm set constructs");

    pool.hand_back(a);
    pool.hand_back(b);
    pool.hand_back(c);
    assert_eq!(pool.idle(), 3, "nothing is deallocated during a session");
}
