// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the host kernel

use mh_core::{ModuleId, PolicyError};
use mh_world::WorldError;
use thiserror::Error;

/// Errors the kernel itself surfaces.
///
/// Module failures never appear here; they are contained at the module
/// boundary, logged, and counted against the breaker. The kernel only
/// reports configuration problems and internal invariant violations.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid execution policy for module {module}: {source}")]
    InvalidPolicy {
        module: ModuleId,
        #[source]
        source: PolicyError,
    },
    #[error("module already registered: {0}")]
    DuplicateModule(ModuleId),
    #[error("kernel already initialized")]
    AlreadyInitialized,
    #[error("kernel not initialized; call initialize() first")]
    NotInitialized,
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
