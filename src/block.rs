// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The logical data unit moved between buckets, stashes and the caller.

use crate::{BlockId, Leaf, DUMMY_BLOCK_ID};

/// The current (partition, leaf) assignment of a logical block.
///
/// Single-tree deployments keep every block in partition 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Index of the sub-tree holding the block.
    pub partition: usize,
    /// Leaf identifying the root-to-leaf path that must contain the block.
    pub leaf: Leaf,
}

impl Location {
    /// A location inside the single tree of a non-partitioned ORAM.
    pub fn leaf_only(leaf: Leaf) -> Self {
        Self { partition: 0, leaf }
    }
}

/// A logical block: id, payload bytes and an optional location tag.
///
/// Dummy blocks pad unused bucket and stash slots; they carry the sentinel
/// id, an empty payload and no location. The payload length of a real block
/// is the size it was written with and is preserved end to end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Logical id, or [`DUMMY_BLOCK_ID`] for padding.
    pub id: BlockId,
    /// The block content. Its length is the stored size.
    pub payload: Vec<u8>,
    /// Where the block is currently headed. Dummy blocks never carry one.
    pub location: Option<Location>,
}

impl Block {
    /// A real block bound for `location`.
    pub fn new(id: BlockId, payload: Vec<u8>, location: Location) -> Self {
        Self {
            id,
            payload,
            location: Some(location),
        }
    }

    /// A padding block.
    pub fn dummy() -> Self {
        Self {
            id: DUMMY_BLOCK_ID,
            payload: Vec::new(),
            location: None,
        }
    }

    /// Whether this block is padding rather than real content.
    pub fn is_dummy(&self) -> bool {
        self.id == DUMMY_BLOCK_ID
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::dummy()
    }
}
