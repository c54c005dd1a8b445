// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Forest ORAM: Path ORAM partitioned into many small independent trees.
//!
//! A single tree tall enough for N blocks forces every access to walk
//! `O(log N)` buckets. Dividing the same node budget into partitions of
//! logarithmic height shortens each access to `O(log(N/P))` buckets at the
//! cost of one stash per partition; a logical block is bound to exactly one
//! partition at a time, and a whole access never leaves that partition.

use crate::generic_oram::GenericOram;
use crate::position_map::{PositionMap, PositionToken, TokenPositionMap};
use crate::stash::Stash;
use crate::storage::StorageBackend;
use crate::tree::{node_count, tree_height, TreeHeight};
use crate::{
    AccessMetrics, BlockId, BoundedStash, InMemoryPositionMap, MemoryBackend, Oram, OramConfig,
    OramError,
};
use rand::{CryptoRng, RngCore};

/// A Forest ORAM with in-memory backends, the usual instantiation.
pub type DefaultForestOram<R> = ForestOram<MemoryBackend, InMemoryPositionMap, BoundedStash, R>;

/// The partitioned engine.
pub struct ForestOram<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> {
    /// The underlying engine, exposed for benchmarking and testing.
    pub engine: GenericOram<D, P, S, R>,
}

/// Height of each partition tree: the logarithm of the height a single-tree
/// Path ORAM would need, with a floor of 1 so that tiny stores still get
/// proper trees. A Path ORAM of height 7 (255 nodes) becomes 17 partitions
/// of height 3 (15 nodes each), for example.
fn partition_height(single_tree_height: TreeHeight) -> TreeHeight {
    single_tree_height.max(2).next_power_of_two().ilog2()
}

impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> ForestOram<D, P, S, R> {
    /// Builds a Forest ORAM for `config.block_count` logical blocks.
    ///
    /// Partition count and height are derived from the block count: enough
    /// partitions are allocated to cover the node budget of the equivalent
    /// single tree. Fails with [`OramError::CapacityExceeded`] if the
    /// derived forest cannot hold the requested blocks.
    pub fn new(config: OramConfig, rng: R) -> Result<Self, OramError> {
        let single_tree_height = tree_height(config.block_count.max(1));
        let height = partition_height(single_tree_height);
        let partitions = node_count(single_tree_height).div_ceil(node_count(height));

        Ok(Self {
            engine: GenericOram::new(config, height, partitions, rng)?,
        })
    }

    /// Installs an observability hook receiving stash occupancies.
    pub fn set_metrics(&mut self, metrics: Box<dyn AccessMetrics>) {
        self.engine.set_metrics(metrics);
    }
}

impl<D: StorageBackend, S: Stash, R: RngCore + CryptoRng> ForestOram<D, TokenPositionMap, S, R> {
    /// Replaces the rotating location-derivation secret.
    pub fn set_token(&mut self, token: &PositionToken) {
        self.engine.position_map.set_token(token);
    }
}

impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> Oram
    for ForestOram<D, P, S, R>
{
    fn read(&mut self, id: BlockId) -> Result<Option<Vec<u8>>, OramError> {
        self.engine.access(id, None)
    }

    fn write(&mut self, id: BlockId, payload: &[u8]) -> Result<usize, OramError> {
        self.engine.access(id, Some(payload))?;
        Ok(payload.len())
    }

    fn block_capacity(&self) -> usize {
        self.engine.block_capacity()
    }

    fn close(self) -> Result<(), OramError> {
        self.engine.close()
    }
}
