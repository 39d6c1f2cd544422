// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed 256-bit type-id sets.
//!
//! `ComponentMask` describes which component types a module needs (or which
//! tables a filtered sync touches); `EventMask` does the same for event
//! types. Membership, union, and intersection are O(1) over four words.

use crate::types::{ComponentTypeId, EventTypeId, MAX_TYPES};
use serde::{Deserialize, Serialize};

const WORDS: usize = MAX_TYPES / 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
struct Bits([u64; WORDS]);

impl Bits {
    fn insert(&mut self, idx: usize) {
        self.0[idx / 64] |= 1 << (idx % 64);
    }

    fn remove(&mut self, idx: usize) {
        self.0[idx / 64] &= !(1 << (idx % 64));
    }

    fn contains(&self, idx: usize) -> bool {
        self.0[idx / 64] & (1 << (idx % 64)) != 0
    }

    fn union_with(&mut self, other: &Bits) {
        for (word, o) in self.0.iter_mut().zip(other.0.iter()) {
            *word |= o;
        }
    }

    fn intersects(&self, other: &Bits) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    fn difference_with(&mut self, other: &Bits) {
        for (word, o) in self.0.iter_mut().zip(other.0.iter()) {
            *word &= !o;
        }
    }

    fn is_superset_of(&self, other: &Bits) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a & b == *b)
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_TYPES).filter(move |i| self.contains(*i))
    }
}

macro_rules! define_mask {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($id:ty);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(Bits);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Builder-style insert.
            pub fn with(mut self, id: $id) -> Self {
                self.insert(id);
                self
            }

            pub fn insert(&mut self, id: $id) {
                self.0.insert(id.index());
            }

            pub fn remove(&mut self, id: $id) {
                self.0.remove(id.index());
            }

            pub fn contains(&self, id: $id) -> bool {
                self.0.contains(id.index())
            }

            /// Merge `other` into `self`.
            pub fn union_with(&mut self, other: &Self) {
                self.0.union_with(&other.0);
            }

            pub fn union(mut self, other: &Self) -> Self {
                self.union_with(other);
                self
            }

            /// Ids set in `self` but not in `other`.
            pub fn difference(mut self, other: &Self) -> Self {
                self.0.difference_with(&other.0);
                self
            }

            /// True if any id is set in both masks.
            pub fn intersects(&self, other: &Self) -> bool {
                self.0.intersects(&other.0)
            }

            /// True if every id set in `other` is also set in `self`.
            pub fn is_superset_of(&self, other: &Self) -> bool {
                self.0.is_superset_of(&other.0)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn iter(&self) -> impl Iterator<Item = $id> + '_ {
                self.0.indices().map(|i| <$id>::new(i as u16))
            }
        }

        impl FromIterator<$id> for $name {
            fn from_iter<I: IntoIterator<Item = $id>>(iter: I) -> Self {
                let mut mask = Self::default();
                for id in iter {
                    mask.insert(id);
                }
                mask
            }
        }
    };
}

define_mask! {
    /// Set of component type ids.
    pub struct ComponentMask(ComponentTypeId);
}

define_mask! {
    /// Set of event type ids.
    pub struct EventMask(EventTypeId);
}

#[cfg(test)]
#[path = "mask_tests.rs"]
mod tests;
