// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event accumulation for slower-than-frame-rate readers.
//!
//! The live bus retires each frame's buffer for exactly one frame. The
//! accumulator clones retired buffers into a frame-tagged history so a
//! module running at, say, 10 Hz still observes every frame's events when
//! its replica is next synced. History entries and their buffers are
//! recycled, not freed.

use crate::error::WorldError;
use crate::events::{AnyEventBuffer, EventBus};
use crate::schema::Schema;
use mh_core::EventTypeId;
use std::collections::VecDeque;
use std::sync::Arc;

struct CapturedFrame {
    frame: u64,
    // indexed by event type id; None when the type had no events that
    // frame and no pooled buffer is attached yet
    buffers: Vec<Option<Box<dyn AnyEventBuffer>>>,
}

impl CapturedFrame {
    fn empty(event_count: usize) -> Self {
        let mut buffers = Vec::with_capacity(event_count);
        buffers.resize_with(event_count, || None);
        Self { frame: 0, buffers }
    }
}

pub struct EventAccumulator {
    schema: Arc<Schema>,
    history: VecDeque<CapturedFrame>,
    spare: Vec<CapturedFrame>,
}

impl EventAccumulator {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            history: VecDeque::new(),
            spare: Vec::new(),
        }
    }

    /// Clone the bus's retired buffers (the frame that just closed) into
    /// history, tagged with `frame`. Returns how many events were
    /// captured; a frame with no events leaves no history entry.
    pub fn capture_frame(&mut self, bus: &EventBus, frame: u64) -> Result<usize, WorldError> {
        let event_count = bus.event_count();
        let mut entry = None;
        let mut captured = 0;

        for idx in 0..event_count {
            let id = EventTypeId::new(idx as u16);
            let retired = bus.retired_buffer(id);
            if retired.len() == 0 {
                continue;
            }
            let entry = entry.get_or_insert_with(|| {
                self.spare
                    .pop()
                    .unwrap_or_else(|| CapturedFrame::empty(event_count))
            });
            if entry.buffers.len() < event_count {
                entry.buffers.resize_with(event_count, || None);
            }
            if entry.buffers[idx].is_none() {
                let fresh = self
                    .schema
                    .new_event_buffer(id)
                    .ok_or(WorldError::UnknownEventType("event id out of range"))?;
                entry.buffers[idx] = Some(fresh);
            }
            if let Some(buffer) = entry.buffers[idx].as_mut() {
                buffer.append_cloned_from(retired)?;
                captured += retired.len();
            }
        }

        if let Some(mut entry) = entry {
            entry.frame = frame;
            self.history.push_back(entry);
        }
        Ok(captured)
    }

    /// Append every history entry newer than `last_seen` into the
    /// replica bus's current buffers, frame order preserved. Returns the
    /// high-water frame the replica now observes.
    pub fn flush_to(&mut self, bus: &mut EventBus, last_seen: u64) -> Result<u64, WorldError> {
        let mut high = last_seen;
        for entry in self.history.iter() {
            if entry.frame <= last_seen {
                continue;
            }
            for (idx, buffer) in entry.buffers.iter().enumerate() {
                let Some(buffer) = buffer else { continue };
                if buffer.len() == 0 {
                    continue;
                }
                let id = EventTypeId::new(idx as u16);
                bus.current_buffer_mut(id)
                    .append_cloned_from(buffer.as_ref())?;
                bus.mark_active(id);
            }
            high = high.max(entry.frame);
        }
        Ok(high)
    }

    /// Recycle history entries every consumer has observed (frame index at
    /// or below `floor`).
    pub fn reclaim(&mut self, floor: u64) {
        while let Some(front) = self.history.front() {
            if front.frame > floor {
                break;
            }
            if let Some(mut entry) = self.history.pop_front() {
                for buffer in entry.buffers.iter_mut().flatten() {
                    buffer.clear();
                }
                self.spare.push(entry);
            }
        }
    }

    /// Frames currently retained.
    pub fn pending_frames(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
#[path = "accumulator_tests.rs"]
mod tests;
