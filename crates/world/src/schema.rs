// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration surface shared by every store of a session.
//!
//! A schema assigns dense ids to component and event types and remembers
//! how to construct their storage, so the live world, persistent replicas,
//! and pooled snapshots all come out structurally identical from one
//! `Arc<Schema>`. Register everything up front; once the schema is behind
//! an `Arc` it cannot change.

use crate::error::WorldError;
use crate::events::{AnyEventBuffer, EventQueue};
use crate::table::{AnyTable, Table};
use mh_core::{ComponentTypeId, EventTypeId, MAX_TYPES};
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// How a component type's slots are stored and copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Flat value, copied by value on the replica path.
    Blittable,
    /// Shared reference, cloned element-wise on the replica path. Both
    /// sides must treat the value as immutable; that contract is declared
    /// here at registration and not checked at runtime.
    Managed,
}

struct ComponentEntry {
    name: &'static str,
    kind: StorageKind,
    make_table: fn() -> Box<dyn AnyTable>,
}

struct EventEntry {
    name: &'static str,
    make_buffer: fn() -> Box<dyn AnyEventBuffer>,
}

fn make_table<E: Clone + Send + Sync + 'static>() -> Box<dyn AnyTable> {
    Box::new(Table::<E>::new())
}

fn make_buffer<E: Clone + Send + Sync + 'static>() -> Box<dyn AnyEventBuffer> {
    Box::new(EventQueue::<E>::new())
}

/// Component and event type registry.
#[derive(Default)]
pub struct Schema {
    components: Vec<ComponentEntry>,
    component_ids: HashMap<TypeId, ComponentTypeId>,
    events: Vec<EventEntry>,
    event_ids: HashMap<TypeId, EventTypeId>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flat-value component type.
    pub fn register_component<T>(&mut self) -> Result<ComponentTypeId, WorldError>
    where
        T: Copy + Send + Sync + 'static,
    {
        self.insert_component::<T>(StorageKind::Blittable, make_table::<T>)
    }

    /// Register a reference-bearing component type, stored as `Arc<T>`.
    ///
    /// Values handed out by views are shared references; the type must be
    /// treated as immutable everywhere.
    pub fn register_managed<T>(&mut self) -> Result<ComponentTypeId, WorldError>
    where
        T: Send + Sync + 'static,
    {
        self.insert_component::<T>(StorageKind::Managed, make_table::<Arc<T>>)
    }

    fn insert_component<T: 'static>(
        &mut self,
        kind: StorageKind,
        make_table: fn() -> Box<dyn AnyTable>,
    ) -> Result<ComponentTypeId, WorldError> {
        let name = std::any::type_name::<T>();
        if self.component_ids.contains_key(&TypeId::of::<T>()) {
            return Err(WorldError::DuplicateType(name));
        }
        if self.components.len() >= MAX_TYPES {
            return Err(WorldError::TypeCapacityExceeded(MAX_TYPES));
        }
        let id = ComponentTypeId::new(self.components.len() as u16);
        self.components.push(ComponentEntry {
            name,
            kind,
            make_table,
        });
        self.component_ids.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Register an event payload type.
    pub fn register_event<E>(&mut self) -> Result<EventTypeId, WorldError>
    where
        E: Clone + Send + Sync + 'static,
    {
        let name = std::any::type_name::<E>();
        if self.event_ids.contains_key(&TypeId::of::<E>()) {
            return Err(WorldError::DuplicateType(name));
        }
        if self.events.len() >= MAX_TYPES {
            return Err(WorldError::TypeCapacityExceeded(MAX_TYPES));
        }
        let id = EventTypeId::new(self.events.len() as u16);
        self.events.push(EventEntry {
            name,
            make_buffer: make_buffer::<E>,
        });
        self.event_ids.insert(TypeId::of::<E>(), id);
        Ok(id)
    }

    pub fn component_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.component_ids.get(&TypeId::of::<T>()).copied()
    }

    pub(crate) fn component_id_dyn(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.component_ids.get(&type_id).copied()
    }

    pub fn event_id<E: 'static>(&self) -> Option<EventTypeId> {
        self.event_ids.get(&TypeId::of::<E>()).copied()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn component_kind(&self, id: ComponentTypeId) -> Option<StorageKind> {
        self.components.get(id.index()).map(|e| e.kind)
    }

    pub fn component_name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.components.get(id.index()).map(|e| e.name)
    }

    pub fn event_name(&self, id: EventTypeId) -> Option<&'static str> {
        self.events.get(id.index()).map(|e| e.name)
    }

    pub(crate) fn new_tables(&self) -> Vec<Box<dyn AnyTable>> {
        self.components.iter().map(|e| (e.make_table)()).collect()
    }

    pub(crate) fn new_event_buffers(&self) -> Vec<Box<dyn AnyEventBuffer>> {
        self.events.iter().map(|e| (e.make_buffer)()).collect()
    }

    pub(crate) fn new_event_buffer(&self, id: EventTypeId) -> Option<Box<dyn AnyEventBuffer>> {
        self.events.get(id.index()).map(|e| (e.make_buffer)())
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
