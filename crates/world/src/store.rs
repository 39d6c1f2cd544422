// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chunked column store.
//!
//! One `Store` is the live world; further stores built from the same
//! schema serve as persistent replicas or pooled snapshots. A store owns
//! its entity index, one table per registered component type, the event
//! bus, and the write watermarks that feed reactive scheduling.

use crate::error::WorldError;
use crate::events::EventBus;
use crate::query::QueryBuilder;
use crate::schema::{Schema, StorageKind};
use crate::table::{AnyTable, Table};
use crate::trigger::Watermarks;
use mh_core::{ComponentMask, ComponentTypeId, Entity, EventTypeId, LifecycleState};
use std::any::TypeId;
use std::sync::Arc;

/// One slot of the entity index.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntitySlot {
    pub(crate) generation: u32,
    pub(crate) occupied: bool,
    pub(crate) state: LifecycleState,
    pub(crate) components: ComponentMask,
}

impl EntitySlot {
    fn fresh() -> Self {
        Self {
            generation: 0,
            occupied: false,
            state: LifecycleState::Constructing,
            components: ComponentMask::new(),
        }
    }
}

pub struct Store {
    schema: Arc<Schema>,
    pub(crate) entities: Vec<EntitySlot>,
    pub(crate) free: Vec<u32>,
    pub(crate) tables: Vec<Box<dyn AnyTable>>,
    pub(crate) watermarks: Watermarks,
    bus: EventBus,
    tick: u64,
    time: f64,
}

impl Store {
    pub fn new(schema: Arc<Schema>) -> Self {
        let tables = schema.new_tables();
        let watermarks = Watermarks::new(schema.component_count());
        let bus = EventBus::new(schema.clone());
        Self {
            schema,
            entities: Vec::new(),
            free: Vec::new(),
            tables,
            watermarks,
            bus,
            tick: 1,
            time: 0.0,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Current global tick. Starts at 1 so "never ran" (tick 0) sorts
    /// strictly before every frame.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation wall-clock in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Close the frame: advance the tick, accumulate time, and swap the
    /// event buffers (which clears the active event set).
    pub fn advance_frame(&mut self, dt: f32) {
        self.tick += 1;
        self.time += dt as f64;
        self.bus.swap_buffers();
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    /// Allocate an entity slot. The entity starts in `Constructing`.
    pub fn create_entity(&mut self) -> Entity {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.entities.push(EntitySlot::fresh());
                (self.entities.len() - 1) as u32
            }
        };
        let slot = &mut self.entities[index as usize];
        slot.occupied = true;
        slot.state = LifecycleState::Constructing;
        slot.components = ComponentMask::new();
        Entity::new(index, slot.generation)
    }

    /// Free the slot, clear every component it held, and bump the
    /// generation so stale handles stop resolving.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), WorldError> {
        let slot_components = {
            let slot = self.live_slot(entity)?;
            slot.components
        };
        for id in slot_components.iter() {
            self.tables[id.index()].remove_slot(entity.index());
            self.watermarks.stamp(id, self.tick);
        }
        let slot = &mut self.entities[entity.index() as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.components = ComponentMask::new();
        self.free.push(entity.index());
        Ok(())
    }

    /// True when the handle resolves to an occupied slot of the same
    /// generation, in any lifecycle state.
    pub fn alive(&self, entity: Entity) -> bool {
        self.entities
            .get(entity.index() as usize)
            .map(|s| s.occupied && s.generation == entity.generation())
            .unwrap_or(false)
    }

    pub fn lifecycle(&self, entity: Entity) -> Option<LifecycleState> {
        let slot = self.entities.get(entity.index() as usize)?;
        (slot.occupied && slot.generation == entity.generation()).then_some(slot.state)
    }

    pub fn set_lifecycle(
        &mut self,
        entity: Entity,
        state: LifecycleState,
    ) -> Result<(), WorldError> {
        let index = entity.index() as usize;
        self.live_slot(entity)?;
        self.entities[index].state = state;
        Ok(())
    }

    /// Occupied slots, in any lifecycle state.
    pub fn entity_count(&self) -> usize {
        self.entities.iter().filter(|s| s.occupied).count()
    }

    fn live_slot(&self, entity: Entity) -> Result<&EntitySlot, WorldError> {
        self.entities
            .get(entity.index() as usize)
            .filter(|s| s.occupied && s.generation == entity.generation())
            .ok_or(WorldError::DeadEntity(entity))
    }

    // ---------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------

    /// Write a blittable component, stamping the chunk version and the
    /// type watermark.
    pub fn set_component<T>(&mut self, entity: Entity, value: T) -> Result<(), WorldError>
    where
        T: Copy + Send + Sync + 'static,
    {
        let id = self.component_id::<T>()?;
        self.live_slot(entity)?;
        self.table_mut::<T>(id)?.set(entity.index(), value);
        self.mark_written(entity, id);
        Ok(())
    }

    /// Write a reference-bearing component. The stored value is shared;
    /// readers receive `Arc` clones.
    pub fn set_managed<T>(&mut self, entity: Entity, value: T) -> Result<(), WorldError>
    where
        T: Send + Sync + 'static,
    {
        let id = self.component_id::<T>()?;
        self.live_slot(entity)?;
        self.table_mut::<Arc<T>>(id)?
            .set(entity.index(), Arc::new(value));
        self.mark_written(entity, id);
        Ok(())
    }

    fn mark_written(&mut self, entity: Entity, id: ComponentTypeId) {
        self.entities[entity.index() as usize].components.insert(id);
        self.watermarks.stamp(id, self.tick);
    }

    /// Copy a blittable component out.
    pub fn get<T>(&self, entity: Entity) -> Option<T>
    where
        T: Copy + Send + Sync + 'static,
    {
        if !self.alive(entity) {
            return None;
        }
        let id = self.schema.component_id::<T>()?;
        self.table_ref::<T>(id)?.get(entity.index()).copied()
    }

    /// Clone the shared reference to a managed component out.
    pub fn get_managed<T>(&self, entity: Entity) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        if !self.alive(entity) {
            return None;
        }
        let id = self.schema.component_id::<T>()?;
        self.table_ref::<Arc<T>>(id)?.get(entity.index()).cloned()
    }

    /// Remove a component by its Rust type.
    pub fn remove_component<T: 'static>(&mut self, entity: Entity) -> Result<bool, WorldError> {
        let id = self
            .schema
            .component_id::<T>()
            .ok_or(WorldError::UnknownComponentType(std::any::type_name::<T>()))?;
        self.remove_component_id(entity, id)
    }

    /// Remove a component by its registered id (type-erased path used by
    /// command playback).
    pub fn remove_component_id(
        &mut self,
        entity: Entity,
        id: ComponentTypeId,
    ) -> Result<bool, WorldError> {
        self.live_slot(entity)?;
        let removed = self.tables[id.index()].remove_slot(entity.index());
        if removed {
            self.entities[entity.index() as usize].components.remove(id);
            self.watermarks.stamp(id, self.tick);
        }
        Ok(removed)
    }

    pub(crate) fn remove_component_dyn(
        &mut self,
        entity: Entity,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<bool, WorldError> {
        let id = self
            .schema
            .component_id_dyn(type_id)
            .ok_or(WorldError::UnknownComponentType(type_name))?;
        self.remove_component_id(entity, id)
    }

    pub fn has_component(&self, entity: Entity, id: ComponentTypeId) -> bool {
        self.entities
            .get(entity.index() as usize)
            .map(|s| {
                s.occupied && s.generation == entity.generation() && s.components.contains(id)
            })
            .unwrap_or(false)
    }

    fn component_id<T: 'static>(&self) -> Result<ComponentTypeId, WorldError> {
        self.schema
            .component_id::<T>()
            .ok_or(WorldError::UnknownComponentType(std::any::type_name::<T>()))
    }

    fn table_ref<E: Clone + Send + Sync + 'static>(&self, id: ComponentTypeId) -> Option<&Table<E>> {
        self.tables[id.index()].as_any().downcast_ref::<Table<E>>()
    }

    fn table_mut<E: Clone + Send + Sync + 'static>(
        &mut self,
        id: ComponentTypeId,
    ) -> Result<&mut Table<E>, WorldError> {
        self.tables[id.index()]
            .as_any_mut()
            .downcast_mut::<Table<E>>()
            .ok_or(WorldError::TableTypeMismatch(std::any::type_name::<E>()))
    }

    /// Storage kind registered for a component type.
    pub fn component_kind(&self, id: ComponentTypeId) -> Option<StorageKind> {
        self.schema.component_kind(id)
    }

    // ---------------------------------------------------------------
    // Events and triggers
    // ---------------------------------------------------------------

    /// Publish an event into the current-frame buffer.
    pub fn publish<E>(&mut self, event: E) -> Result<EventTypeId, WorldError>
    where
        E: Clone + Send + Sync + 'static,
    {
        self.bus.publish(event)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Last tick any entity's value of `id` was written.
    pub fn watermark(&self, id: ComponentTypeId) -> u64 {
        self.watermarks.get(id)
    }

    /// True if any watched component type was written after `since`.
    pub fn components_changed_since(&self, watch: &ComponentMask, since: u64) -> bool {
        self.watermarks.changed_since(watch, since)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // ---------------------------------------------------------------
    // Session reset
    // ---------------------------------------------------------------

    /// Empty all session state while keeping every allocation: entity
    /// index, tables (chunk capacity preserved), event buffers,
    /// watermarks, tick, and time.
    pub fn soft_clear(&mut self) {
        self.entities.clear();
        self.free.clear();
        for table in &mut self.tables {
            table.soft_clear();
        }
        self.watermarks.clear();
        self.bus.soft_clear();
        self.tick = 1;
        self.time = 0.0;
    }

    pub(crate) fn set_frame(&mut self, tick: u64, time: f64) {
        self.tick = tick;
        self.time = time;
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
