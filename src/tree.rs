// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Arithmetic over complete binary trees.
//!
//! Nodes are numbered `0..2^(height+1) - 1` in the standard heap encoding
//! (root 0, children of node `n` at `2n + 1` and `2n + 2`); leaves are
//! numbered `0..2^height` left to right.

use crate::Leaf;

/// Height of an ORAM tree. A tree of height H has `2^(H+1) - 1` nodes.
pub type TreeHeight = u32;

/// A node id in the heap encoding.
pub type NodeId = u64;

/// Shape parameters handed to position-map construction.
#[derive(Clone, Copy, Debug)]
pub struct TreeConfig {
    /// Height of each tree.
    pub height: TreeHeight,
    /// Number of independent trees (1 for plain Path ORAM).
    pub partitions: usize,
}

/// The smallest height H such that a tree of height H has at least
/// `min_nodes` nodes, i.e. `2^(H+1) - 1 >= min_nodes`.
///
/// `ceil(log2(min_nodes))` over-provisions by one level whenever the next
/// power of two minus one already covers the requirement, so the result is
/// adjusted down in that case. For example five nodes need height 2 (seven
/// nodes), while sixteen nodes need height 4: a tree of height 3 holds only
/// fifteen.
pub fn tree_height(min_nodes: usize) -> TreeHeight {
    assert!(min_nodes > 0);

    let height = (min_nodes as u64).next_power_of_two().ilog2();
    if height == 0 {
        return 0;
    }

    let nodes = 1u64 << height;
    if nodes - 1 >= min_nodes as u64 {
        height - 1
    } else {
        height
    }
}

/// The number of nodes in a complete binary tree of the given height.
pub fn node_count(height: TreeHeight) -> usize {
    (1usize << (height + 1)) - 1
}

/// The number of leaves in a complete binary tree of the given height.
pub fn leaf_count(height: TreeHeight) -> u64 {
    1u64 << height
}

/// The ordered sequence of node ids from the root down to `leaf`.
///
/// The binary representation of `leaf + 2^height` encodes the root-to-leaf
/// walk: repeatedly halving it visits each ancestor, and subtracting one at
/// each step converts from the one-based position to the heap node id. The
/// result always has `height + 1` entries, root first.
pub fn path_to_leaf(leaf: Leaf, height: TreeHeight) -> Vec<NodeId> {
    debug_assert!(leaf < leaf_count(height));

    let mut path = vec![0; height as usize + 1];
    let mut position = leaf + (1 << height);
    let mut depth = height as usize;

    while position > 0 {
        path[depth] = position - 1;
        depth = depth.wrapping_sub(1);
        position >>= 1;
    }

    path
}

/// Whether the paths of two leaves pass through the same node at `depth`
/// (0 = root, `height` = leaf level).
///
/// Tested by comparing the leading bits of the one-based leaf positions:
/// `(a >> shift) == (b >> shift)` with `shift = height - depth`.
pub fn shares_path_at(a_leaf: Leaf, b_leaf: Leaf, height: TreeHeight, depth: TreeHeight) -> bool {
    debug_assert!(depth <= height);

    let shift = height - depth;
    (a_leaf >> shift) == (b_leaf >> shift)
}
