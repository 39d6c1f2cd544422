//! Event accumulation end to end: live bus → history → replica view.

use crate::prelude::*;
use mh_world::{EventAccumulator, Store, WorldView};
use parking_lot::Mutex;
use std::sync::Arc;

/// Every event published on the live bus in a frame the consumer has not
/// seen replays into the replica in its original insertion order.
#[test]
fn missed_events_replay_in_insertion_order() {
    let schema = schema();
    let mut live = Store::new(schema.clone());
    let mut replica = Store::new(schema.clone());
    let mut accumulator = EventAccumulator::new(schema);

    // frame 1 publishes two, frame 2 publishes one
    live.publish(Explosion { radius: 1.0 }).unwrap();
    live.publish(Explosion { radius: 1.5 }).unwrap();
    live.advance_frame(FRAME);
    accumulator.capture_frame(live.bus(), 1).unwrap();

    live.publish(Explosion { radius: 2.0 }).unwrap();
    live.advance_frame(FRAME);
    accumulator.capture_frame(live.bus(), 2).unwrap();

    // the consumer last saw frame 0
    replica.sync_from(&live, None).unwrap();
    accumulator.flush_to(replica.bus_mut(), 0).unwrap();

    let view = WorldView::shared(Arc::new(Mutex::new(replica)));
    let radii: Vec<f32> = view.events::<Explosion>().iter().map(|e| e.radius).collect();
    assert_eq!(radii, vec![1.0, 1.5, 2.0]);
}

/// A consumer at the frame rate observes each frame's events exactly once.
#[test]
fn up_to_date_consumer_sees_each_event_once() {
    let schema = schema();
    let mut live = Store::new(schema.clone());
    let mut replica = Store::new(schema.clone());
    let mut accumulator = EventAccumulator::new(schema);
    let mut last_seen = 0;

    for frame in 1..=3u64 {
        live.publish(Explosion {
            radius: frame as f32,
        })
        .unwrap();
        live.advance_frame(FRAME);
        accumulator.capture_frame(live.bus(), frame).unwrap();

        replica.sync_from(&live, None).unwrap();
        replica.bus_mut().soft_clear();
        last_seen = accumulator
            .flush_to(replica.bus_mut(), last_seen)
            .unwrap();
        accumulator.reclaim(last_seen);

        let radii: Vec<f32> = replica
            .bus()
            .current_events::<Explosion>()
            .iter()
            .map(|e| e.radius)
            .collect();
        assert_eq!(radii, vec![frame as f32], "frame {} replays alone", frame);
    }
}
