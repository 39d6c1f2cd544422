// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The module contract.
//!
//! A module is a user-supplied logic unit with a stable name and a tick
//! entry point. Ticks read the world through the leased view and record
//! every mutation into the command buffer; the kernel applies buffers to
//! the live world during harvest.

use async_trait::async_trait;
use mh_world::{CommandBuffer, WorldError, WorldView};
use thiserror::Error;

/// Failure carried out of a module tick.
///
/// Counted against the module's circuit breaker; the tick's command
/// buffer is discarded.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

impl ModuleError {
    pub fn msg(message: impl Into<String>) -> Self {
        ModuleError::Failed(message.into())
    }
}

/// Everything one tick gets to work with.
pub struct TickContext {
    view: WorldView,
    commands: CommandBuffer,
    dt: f32,
}

impl TickContext {
    pub(crate) fn new(view: WorldView, dt: f32) -> Self {
        Self {
            view,
            commands: CommandBuffer::new(),
            dt,
        }
    }

    /// Read-only view of the world this tick was dispatched against.
    pub fn view(&self) -> &WorldView {
        &self.view
    }

    /// Simulation time accumulated since the module last ran, seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The tick's mutation channel.
    pub fn commands(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    pub(crate) fn into_parts(self) -> (WorldView, CommandBuffer) {
        (self.view, self.commands)
    }
}

/// A background logic unit scheduled by the kernel.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Stable name; used for logs, diagnostics, and duplicate detection.
    fn name(&self) -> &str;

    /// One scheduled run. May suspend, but must never block the kernel
    /// thread it did not start on.
    async fn tick(&self, ctx: &mut TickContext) -> Result<(), ModuleError>;
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;
