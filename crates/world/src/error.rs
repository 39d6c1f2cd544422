// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the world crate

use mh_core::Entity;
use thiserror::Error;

/// Errors that can occur in stores and the primitives built on them
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("type capacity exceeded ({0} types max)")]
    TypeCapacityExceeded(usize),
    #[error("type already registered: {0}")]
    DuplicateType(&'static str),
    #[error("component type not registered: {0}")]
    UnknownComponentType(&'static str),
    #[error("event type not registered: {0}")]
    UnknownEventType(&'static str),
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),
    #[error("stores were built from different schemas")]
    SchemaMismatch,
    #[error("table storage does not match its registered type: {0}")]
    TableTypeMismatch(&'static str),
}
