// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dirty-chunk replica sync.
//!
//! Copies only chunks whose write version differs between source and
//! destination, optionally restricted to a component mask. A static world
//! produces zero traffic; repeating a sync with no writes in between
//! touches zero chunks.

use crate::error::WorldError;
use crate::store::Store;
use mh_core::ComponentMask;
use serde::Serialize;

/// Outcome of one sync pass, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Chunks whose contents were copied (allocated on the destination if
    /// needed).
    pub chunks_copied: usize,
    /// Destination chunks dropped because the source no longer holds them.
    pub chunks_cleared: usize,
    /// Chunks skipped because the versions already matched.
    pub chunks_skipped: usize,
    /// Tables excluded by the component mask.
    pub tables_skipped: usize,
}

impl Store {
    /// Bring this store up to date with `src`.
    ///
    /// `mask` of `None` syncs every component table (persistent replicas);
    /// `Some` skips tables whose id is not in the mask (filtered
    /// snapshots). The entity index, watermarks, tick, and time are always
    /// copied; the event bus is not touched — event transport is the
    /// accumulator's job.
    ///
    /// Both stores must come from the same schema.
    pub fn sync_from(
        &mut self,
        src: &Store,
        mask: Option<&ComponentMask>,
    ) -> Result<SyncStats, WorldError> {
        if !std::sync::Arc::ptr_eq(self.schema(), src.schema()) {
            return Err(WorldError::SchemaMismatch);
        }

        let mut stats = SyncStats::default();
        for (idx, (dst_table, src_table)) in
            self.tables.iter_mut().zip(src.tables.iter()).enumerate()
        {
            if let Some(mask) = mask {
                if !mask.contains(mh_core::ComponentTypeId::new(idx as u16)) {
                    stats.tables_skipped += 1;
                    continue;
                }
            }
            let chunks = dst_table.chunk_count().max(src_table.chunk_count());
            for chunk in 0..chunks {
                match (src_table.chunk_version(chunk), dst_table.chunk_version(chunk)) {
                    (None, None) => {}
                    (None, Some(_)) => {
                        dst_table.clear_chunk(chunk);
                        stats.chunks_cleared += 1;
                    }
                    (Some(sv), Some(dv)) if sv == dv => {
                        stats.chunks_skipped += 1;
                    }
                    (Some(_), _) => {
                        dst_table.copy_chunk_from(src_table.as_ref(), chunk)?;
                        stats.chunks_copied += 1;
                    }
                }
            }
        }

        // Entity index and frame metadata travel wholesale; slots are
        // small Copy values, so this reuses the destination's capacity.
        self.entities.clear();
        self.entities.extend_from_slice(&src.entities);
        self.free.clear();
        self.free.extend_from_slice(&src.free);
        self.watermarks.copy_from(&src.watermarks);
        self.set_frame(src.tick(), src.time());

        tracing::trace!(
            copied = stats.chunks_copied,
            cleared = stats.chunks_cleared,
            skipped = stats.chunks_skipped,
            "replica sync"
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
