// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Double-buffered event bus.
//!
//! Publishers append into the current-frame buffer; consumers read it in
//! the same frame. Swapping retires the current buffer for one frame so
//! the event accumulator can capture it before it is recycled. Publishing
//! also sets the type's bit in the active set, the reactive trigger for
//! event-watching modules; the set clears exactly on swap.

use crate::error::WorldError;
use crate::schema::Schema;
use mh_core::{EventMask, EventTypeId};
use std::any::Any;
use std::sync::Arc;

/// Type-erased event buffer surface.
pub(crate) trait AnyEventBuffer: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn len(&self) -> usize;

    fn clear(&mut self);

    /// Append clones of every event in `src`, preserving order.
    fn append_cloned_from(&mut self, src: &dyn AnyEventBuffer) -> Result<(), WorldError>;
}

/// Typed event buffer.
pub(crate) struct EventQueue<E> {
    items: Vec<E>,
}

impl<E> EventQueue<E> {
    pub(crate) fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub(crate) fn items(&self) -> &[E] {
        &self.items
    }
}

impl<E: Clone + Send + Sync + 'static> AnyEventBuffer for EventQueue<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn append_cloned_from(&mut self, src: &dyn AnyEventBuffer) -> Result<(), WorldError> {
        let src = src
            .as_any()
            .downcast_ref::<EventQueue<E>>()
            .ok_or(WorldError::TableTypeMismatch(std::any::type_name::<E>()))?;
        self.items.extend(src.items.iter().cloned());
        Ok(())
    }
}

/// Per-store event bus: one current and one retired buffer per event type,
/// plus the active-type bitmap for the current frame.
pub struct EventBus {
    schema: Arc<Schema>,
    current: Vec<Box<dyn AnyEventBuffer>>,
    retired: Vec<Box<dyn AnyEventBuffer>>,
    active: EventMask,
}

impl EventBus {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        let current = schema.new_event_buffers();
        let retired = schema.new_event_buffers();
        Self {
            schema,
            current,
            retired,
            active: EventMask::new(),
        }
    }

    /// Append an event to the current-frame buffer and mark its type active.
    pub fn publish<E: Clone + Send + Sync + 'static>(
        &mut self,
        event: E,
    ) -> Result<EventTypeId, WorldError> {
        let id = self
            .schema
            .event_id::<E>()
            .ok_or(WorldError::UnknownEventType(std::any::type_name::<E>()))?;
        let queue = self.current[id.index()]
            .as_any_mut()
            .downcast_mut::<EventQueue<E>>()
            .ok_or(WorldError::TableTypeMismatch(std::any::type_name::<E>()))?;
        queue.items.push(event);
        self.active.insert(id);
        Ok(id)
    }

    /// Event types published since the last swap.
    pub fn active_events(&self) -> EventMask {
        self.active
    }

    /// Events of type `E` visible this frame.
    pub fn current_events<E: Clone + Send + Sync + 'static>(&self) -> &[E] {
        let Some(id) = self.schema.event_id::<E>() else {
            return &[];
        };
        self.current[id.index()]
            .as_any()
            .downcast_ref::<EventQueue<E>>()
            .map(|q| q.items())
            .unwrap_or(&[])
    }

    /// Retire the current buffers and recycle last frame's. Clears the
    /// active set.
    pub fn swap_buffers(&mut self) {
        for buffer in &mut self.retired {
            buffer.clear();
        }
        std::mem::swap(&mut self.current, &mut self.retired);
        self.active = EventMask::new();
    }

    pub(crate) fn retired_buffer(&self, id: EventTypeId) -> &dyn AnyEventBuffer {
        self.retired[id.index()].as_ref()
    }

    pub(crate) fn current_buffer_mut(&mut self, id: EventTypeId) -> &mut dyn AnyEventBuffer {
        self.current[id.index()].as_mut()
    }

    pub(crate) fn mark_active(&mut self, id: EventTypeId) {
        self.active.insert(id);
    }

    pub(crate) fn event_count(&self) -> usize {
        self.current.len()
    }

    /// Empty both buffer sets and the active set, keeping capacity.
    pub fn soft_clear(&mut self) {
        for buffer in self.current.iter_mut().chain(self.retired.iter_mut()) {
            buffer.clear();
        }
        self.active = EventMask::new();
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
