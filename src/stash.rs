// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The bounded overflow container holding blocks not currently embedded in a
//! tree bucket.

use crate::{Block, BlockId, OramError};

/// A Path ORAM stash.
///
/// Holds blocks evicted from storage that could not yet be re-embedded.
/// Under correct eviction its expected occupancy stays small (O(log N) for a
/// correctly sized tree), so its capacity is a hard bound: exhaustion on
/// [`add`](Stash::add) means the stash was under-provisioned and is fatal.
pub trait Stash
where
    Self: Sized,
{
    /// Creates a stash with `capacity` preallocated free slots.
    fn new(capacity: usize) -> Result<Self, OramError>;

    /// Inserts `block` into the first free slot.
    fn add(&mut self, block: Block) -> Result<(), OramError>;

    /// A copy of the block with the given id, without removing it.
    fn get(&self, id: BlockId) -> Option<Block>;

    /// Upserts by id: replaces the content of an existing entry, or occupies
    /// a free slot if none matches. Returns whether a prior entry existed.
    fn update(&mut self, block: Block) -> Result<bool, OramError>;

    /// Removes and returns the block with the given id.
    fn take(&mut self, id: BlockId) -> Option<Block>;

    /// Removes the block with the given id, discarding it.
    fn remove(&mut self, id: BlockId) {
        self.take(id);
    }

    /// A restartable single-pass scan over the real (non-dummy) entries.
    ///
    /// Each call starts a fresh scan from the beginning; dropping the
    /// iterator early truncates the scan.
    fn scan(&self) -> impl Iterator<Item = &Block>;

    /// The number of real blocks currently held.
    fn occupancy(&self) -> usize;

    /// Releases all entries.
    fn clear(&mut self);
}

/// A stash backed by a fixed-size slot array; empty slots are the dummies.
#[derive(Debug)]
pub struct BoundedStash {
    slots: Vec<Option<Block>>,
}

impl BoundedStash {
    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }

    fn position_of(&self, id: BlockId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|block| block.id == id))
    }
}

impl Stash for BoundedStash {
    fn new(capacity: usize) -> Result<Self, OramError> {
        if capacity == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "stash capacity must be nonzero",
            });
        }
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);
        Ok(Self { slots })
    }

    fn add(&mut self, block: Block) -> Result<(), OramError> {
        debug_assert!(!block.is_dummy());

        match self.free_slot() {
            Some(free) => {
                self.slots[free] = Some(block);
                Ok(())
            }
            None => Err(OramError::StashExhausted {
                capacity: self.slots.len(),
            }),
        }
    }

    fn get(&self, id: BlockId) -> Option<Block> {
        self.position_of(id)
            .and_then(|index| self.slots[index].clone())
    }

    fn update(&mut self, block: Block) -> Result<bool, OramError> {
        match self.position_of(block.id) {
            Some(existing) => {
                self.slots[existing] = Some(block);
                Ok(true)
            }
            None => {
                self.add(block)?;
                Ok(false)
            }
        }
    }

    fn take(&mut self, id: BlockId) -> Option<Block> {
        self.position_of(id)
            .and_then(|index| self.slots[index].take())
    }

    fn scan(&self) -> impl Iterator<Item = &Block> {
        self.slots.iter().flatten()
    }

    fn occupancy(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
