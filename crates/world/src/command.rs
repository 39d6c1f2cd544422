// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred mutation buffers and their playback.
//!
//! Module ticks have no mutation rights on their views; every change is
//! recorded here and applied to the live world on the kernel thread during
//! harvest. Playback runs three sub-phases so a buffer can spawn an
//! entity, configure it, and tear another down without ordering hazards:
//! creates first, then value mutations and publishes, then destroys.

use crate::error::WorldError;
use crate::store::Store;
use mh_core::{Entity, LifecycleState};
use serde::Serialize;
use std::any::TypeId;

/// Entity that will exist once this buffer's creates have been played
/// back. Valid only within the buffer that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingEntity(u32);

/// Target of a recorded command: an entity that already exists, or one
/// this buffer creates.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef {
    Existing(Entity),
    Pending(PendingEntity),
}

impl From<Entity> for EntityRef {
    fn from(e: Entity) -> Self {
        EntityRef::Existing(e)
    }
}

impl From<PendingEntity> for EntityRef {
    fn from(p: PendingEntity) -> Self {
        EntityRef::Pending(p)
    }
}

trait ComponentWrite: Send {
    fn apply(self: Box<Self>, store: &mut Store, entity: Entity) -> Result<(), WorldError>;
}

struct WriteValue<T> {
    value: T,
}

impl<T: Copy + Send + Sync + 'static> ComponentWrite for WriteValue<T> {
    fn apply(self: Box<Self>, store: &mut Store, entity: Entity) -> Result<(), WorldError> {
        store.set_component(entity, self.value)
    }
}

struct WriteManaged<T> {
    value: T,
}

impl<T: Send + Sync + 'static> ComponentWrite for WriteManaged<T> {
    fn apply(self: Box<Self>, store: &mut Store, entity: Entity) -> Result<(), WorldError> {
        store.set_managed(entity, self.value)
    }
}

trait EventWrite: Send {
    fn apply(self: Box<Self>, store: &mut Store) -> Result<(), WorldError>;
}

struct PublishValue<E> {
    event: E,
}

impl<E: Clone + Send + Sync + 'static> EventWrite for PublishValue<E> {
    fn apply(self: Box<Self>, store: &mut Store) -> Result<(), WorldError> {
        store.publish(self.event).map(|_| ())
    }
}

enum Command {
    Create {
        pending: PendingEntity,
    },
    Destroy {
        target: EntityRef,
    },
    SetLifecycle {
        target: EntityRef,
        state: LifecycleState,
    },
    Write {
        target: EntityRef,
        write: Box<dyn ComponentWrite>,
    },
    Remove {
        target: EntityRef,
        type_id: TypeId,
        type_name: &'static str,
    },
    Publish {
        publish: Box<dyn EventWrite>,
    },
}

/// Counters from one buffer playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStats {
    pub created: usize,
    pub mutated: usize,
    pub published: usize,
    pub destroyed: usize,
    /// Commands dropped because their target was gone by playback time.
    pub skipped_stale: usize,
}

/// Append-only log of deferred mutations produced by one module tick.
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    next_pending: u32,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Stage an entity creation. The entity enters `Constructing` during
    /// playback; follow up with `set_lifecycle_state` to activate it.
    pub fn create_entity(&mut self) -> PendingEntity {
        let pending = PendingEntity(self.next_pending);
        self.next_pending += 1;
        self.commands.push(Command::Create { pending });
        pending
    }

    pub fn destroy_entity(&mut self, target: impl Into<EntityRef>) {
        self.commands.push(Command::Destroy {
            target: target.into(),
        });
    }

    pub fn set_lifecycle_state(&mut self, target: impl Into<EntityRef>, state: LifecycleState) {
        self.commands.push(Command::SetLifecycle {
            target: target.into(),
            state,
        });
    }

    /// Record a blittable component write.
    pub fn set_component<T>(&mut self, target: impl Into<EntityRef>, value: T)
    where
        T: Copy + Send + Sync + 'static,
    {
        self.commands.push(Command::Write {
            target: target.into(),
            write: Box::new(WriteValue { value }),
        });
    }

    /// Record a component write on an entity that does not have the
    /// component yet. The store treats add and set alike; both names are
    /// kept for call-site clarity.
    pub fn add_component<T>(&mut self, target: impl Into<EntityRef>, value: T)
    where
        T: Copy + Send + Sync + 'static,
    {
        self.set_component(target, value);
    }

    /// Record a reference-bearing component write.
    pub fn set_managed<T>(&mut self, target: impl Into<EntityRef>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.commands.push(Command::Write {
            target: target.into(),
            write: Box::new(WriteManaged { value }),
        });
    }

    pub fn remove_component<T: 'static>(&mut self, target: impl Into<EntityRef>) {
        self.commands.push(Command::Remove {
            target: target.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        });
    }

    pub fn publish_event<E>(&mut self, event: E)
    where
        E: Clone + Send + Sync + 'static,
    {
        self.commands.push(Command::Publish {
            publish: Box::new(PublishValue { event }),
        });
    }

    /// Apply every recorded command to `store`.
    ///
    /// Three sub-phases: creates, then value mutations and publishes in
    /// insertion order, then destroys. Commands whose existing target died
    /// before playback are skipped and counted.
    pub fn play_back(self, store: &mut Store) -> Result<PlaybackStats, WorldError> {
        let mut stats = PlaybackStats::default();
        let mut minted: Vec<Entity> = Vec::with_capacity(self.next_pending as usize);

        // Phase 1: stage creations so later commands can address them.
        for command in &self.commands {
            if let Command::Create { .. } = command {
                minted.push(store.create_entity());
                stats.created += 1;
            }
        }

        let resolve = |target: &EntityRef, minted: &[Entity]| -> Option<Entity> {
            match target {
                EntityRef::Existing(e) => Some(*e),
                EntityRef::Pending(p) => minted.get(p.0 as usize).copied(),
            }
        };

        // Phase 2: value mutations, lifecycle transitions, publishes.
        let mut destroys = Vec::new();
        for command in self.commands {
            match command {
                Command::Create { .. } => {}
                Command::Destroy { target } => destroys.push(target),
                Command::SetLifecycle { target, state } => {
                    match resolve(&target, &minted).filter(|e| store.alive(*e)) {
                        Some(entity) => {
                            store.set_lifecycle(entity, state)?;
                            stats.mutated += 1;
                        }
                        None => stats.skipped_stale += 1,
                    }
                }
                Command::Write { target, write } => {
                    match resolve(&target, &minted).filter(|e| store.alive(*e)) {
                        Some(entity) => {
                            write.apply(store, entity)?;
                            stats.mutated += 1;
                        }
                        None => stats.skipped_stale += 1,
                    }
                }
                Command::Remove {
                    target,
                    type_id,
                    type_name,
                } => match resolve(&target, &minted).filter(|e| store.alive(*e)) {
                    Some(entity) => {
                        store.remove_component_dyn(entity, type_id, type_name)?;
                        stats.mutated += 1;
                    }
                    None => stats.skipped_stale += 1,
                },
                Command::Publish { publish } => {
                    publish.apply(store)?;
                    stats.published += 1;
                }
            }
        }

        // Phase 3: destroys last, so a buffer that configures an entity
        // and tears another down stays coherent.
        for target in destroys {
            match resolve(&target, &minted).filter(|e| store.alive(*e)) {
                Some(entity) => {
                    store.destroy_entity(entity)?;
                    stats.destroyed += 1;
                }
                None => stats.skipped_stale += 1,
            }
        }

        if stats.skipped_stale > 0 {
            tracing::debug!(skipped = stats.skipped_stale, "stale command targets skipped");
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
