// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mh-world: chunked column store, event bus, and the data-plane
//! primitives built on them (dirty-chunk sync, event accumulation,
//! snapshot pooling, command playback, read-only views).

pub mod accumulator;
pub mod command;
mod error;
pub mod events;
pub mod pool;
pub mod query;
pub mod schema;
pub mod store;
pub mod sync;
mod table;
pub mod trigger;
pub mod view;

pub use accumulator::EventAccumulator;
pub use command::{CommandBuffer, EntityRef, PendingEntity, PlaybackStats};
pub use error::WorldError;
pub use events::EventBus;
pub use pool::{SnapshotLease, SnapshotPool};
pub use query::QueryBuilder;
pub use schema::{Schema, StorageKind};
pub use store::Store;
pub use sync::SyncStats;
pub use table::CHUNK_SIZE;
pub use trigger::Watermarks;
pub use view::{ViewQuery, WorldView};
