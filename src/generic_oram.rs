// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The access protocol shared by Path ORAM and Forest ORAM, generic over the
//! storage backend, position map and stash data structures.

use crate::position_map::PositionMap;
use crate::stash::Stash;
use crate::storage::StorageBackend;
use crate::tree::{self, NodeId, TreeConfig, TreeHeight};
use crate::{AccessMetrics, Block, BlockId, Location, OramConfig, OramError};
use rand::{CryptoRng, RngCore};

/// An engine operating `partitions` independent trees of equal height.
///
/// Plain Path ORAM is the single-partition case. The engine is stateless
/// between operations: all persistent state lives in the position map, the
/// per-partition stashes and the storage backend. One logical access runs
/// the six protocol phases to completion before the next may begin; callers
/// needing concurrency must serialize externally.
pub struct GenericOram<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> {
    // The fields below are not meant to be exposed to clients. They are
    // public for benchmarking and testing purposes.
    /// The untrusted memory the engine is obliviously accessing on behalf of
    /// its client.
    pub storage: D,
    /// One stash per partition.
    pub stashes: Vec<S>,
    /// The position map.
    pub position_map: P,
    /// Height of each tree.
    pub height: TreeHeight,
    /// Number of independent trees.
    pub partitions: usize,

    name: String,
    block_count: usize,
    block_size: usize,
    bucket_capacity: usize,
    partition_nodes: usize,
    rng: R,
    metrics: Option<Box<dyn AccessMetrics>>,
}

impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng>
    GenericOram<D, P, S, R>
{
    /// Builds an engine of `partitions` trees of the given height.
    ///
    /// Fails with [`OramError::CapacityExceeded`] when the resulting bucket
    /// slots cannot hold `config.block_count` blocks.
    pub fn new(
        config: OramConfig,
        height: TreeHeight,
        partitions: usize,
        mut rng: R,
    ) -> Result<Self, OramError> {
        if config.block_count == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "block count must be nonzero",
            });
        }
        if config.block_size == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "block size must be nonzero",
            });
        }
        if config.bucket_capacity == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "bucket capacity must be nonzero",
            });
        }

        let partition_nodes = tree::node_count(height);
        let total_slots = partitions * partition_nodes * config.bucket_capacity;
        if total_slots < config.block_count {
            return Err(OramError::CapacityExceeded {
                requested: config.block_count,
                capacity: total_slots,
            });
        }

        log::debug!(
            "GenericOram::new -- {} (N = {}, B = {}, Z = {}, {} partitions of height {})",
            config.name,
            config.block_count,
            config.block_size,
            config.bucket_capacity,
            partitions,
            height,
        );

        let stash_capacity = config
            .stash_capacity
            .unwrap_or_else(|| default_stash_capacity(config.bucket_capacity, height));
        let mut stashes = Vec::with_capacity(partitions);
        for _ in 0..partitions {
            stashes.push(S::new(stash_capacity)?);
        }

        let tree_config = TreeConfig { height, partitions };
        let position_map = P::new(config.block_count, &tree_config, &mut rng)?;

        let storage = D::new(
            &config.name,
            partitions * partition_nodes,
            config.bucket_capacity,
            config.block_size,
        )?;

        Ok(Self {
            storage,
            stashes,
            position_map,
            height,
            partitions,
            name: config.name,
            block_count: config.block_count,
            block_size: config.block_size,
            bucket_capacity: config.bucket_capacity,
            partition_nodes,
            rng,
            metrics: None,
        })
    }

    /// The number of addressable logical blocks.
    pub fn block_capacity(&self) -> usize {
        self.block_count
    }

    /// The configured maximum payload size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Installs an observability hook receiving stash occupancies.
    pub fn set_metrics(&mut self, metrics: Box<dyn AccessMetrics>) {
        self.metrics = Some(metrics);
    }

    /// One oblivious access: a read when `new_payload` is `None`, otherwise
    /// a write of the given payload.
    ///
    /// Whatever the id and whether it hits, the operation reads and then
    /// rewrites exactly the `height + 1` buckets on the path to the block's
    /// previous leaf.
    pub fn access(
        &mut self,
        id: BlockId,
        new_payload: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, OramError> {
        if id >= self.block_count as u64 {
            return Err(OramError::IndexOutOfBounds {
                id,
                capacity: self.block_count,
            });
        }
        if let Some(payload) = new_payload {
            if payload.len() > self.block_size {
                return Err(OramError::PayloadTooLarge {
                    size: payload.len(),
                    block_size: self.block_size,
                });
            }
        }

        // Locate, then fetch the full path to the block's current leaf and
        // merge every real block into the partition's stash. Dummies only
        // pad the wire format and are dropped here.
        let old = self.position_map.get(id)?;
        let path = tree::path_to_leaf(old.leaf, self.height);
        let node_offset = old.partition * self.partition_nodes;
        for node in &path {
            let bucket = self.storage.read_bucket(node_offset + *node as usize)?;
            for block in bucket {
                if !block.is_dummy() {
                    self.stashes[old.partition].add(block)?;
                }
            }
        }

        // Resolve against the stash, then re-randomize the block's location.
        // The position map update precedes the stash upsert so the retained
        // copy carries the new location, never the one it was fetched under.
        let hit = self.stashes[old.partition].get(id);
        let new = self.position_map.update(id, &mut self.rng)?;

        let outgoing = match new_payload {
            Some(payload) => Some(payload.to_vec()),
            None => hit.as_ref().map(|block| block.payload.clone()),
        };
        let mut moved_to = None;
        if let Some(payload) = outgoing {
            let block = Block::new(id, payload, new);
            if new.partition == old.partition {
                self.stashes[old.partition].update(block)?;
            } else {
                self.stashes[old.partition].remove(id);
                self.stashes[new.partition].update(block)?;
                moved_to = Some(new.partition);
            }
        }

        self.evict(old, &path)?;

        if let Some(metrics) = self.metrics.as_mut() {
            metrics.stash_occupancy(old.partition, self.stashes[old.partition].occupancy());
            if let Some(partition) = moved_to {
                metrics.stash_occupancy(partition, self.stashes[partition].occupancy());
            }
        }

        Ok(hit.map(|block| block.payload))
    }

    /// Phases five and six: greedy bottom-up selection and write-back along
    /// the fetched path.
    ///
    /// Walking from the accessed leaf up to the root, each level takes up to
    /// Z stash entries whose *current* position-map location passes through
    /// the same node, pads with dummies and persists the bucket. Pushing
    /// blocks as deep as their target leaf legally allows is what keeps the
    /// expected stash occupancy bounded.
    fn evict(&mut self, at: Location, path: &[NodeId]) -> Result<(), OramError> {
        let node_offset = at.partition * self.partition_nodes;

        for depth in (0..=self.height).rev() {
            let mut selected: Vec<(BlockId, Location)> =
                Vec::with_capacity(self.bucket_capacity);
            for candidate in self.stashes[at.partition].scan() {
                if selected.len() == self.bucket_capacity {
                    break;
                }
                let current = self.position_map.get(candidate.id)?;
                if current.partition == at.partition
                    && tree::shares_path_at(at.leaf, current.leaf, self.height, depth)
                {
                    selected.push((candidate.id, current));
                }
            }

            let mut bucket = Vec::with_capacity(self.bucket_capacity);
            for (id, current) in selected {
                if let Some(mut block) = self.stashes[at.partition].take(id) {
                    block.location = Some(current);
                    bucket.push(block);
                }
            }
            bucket.resize_with(self.bucket_capacity, Block::dummy);

            self.storage
                .write_bucket(node_offset + path[depth as usize] as usize, bucket)?;
        }

        Ok(())
    }

    /// Releases the position map, the stashes and the storage backend.
    pub fn close(mut self) -> Result<(), OramError> {
        log::debug!("GenericOram::close -- {}", self.name);
        for stash in &mut self.stashes {
            stash.clear();
        }
        self.storage.close()
    }
}

/// Default per-stash capacity: a path's worth of blocks with a generous
/// overflow margin. Validated empirically against random workloads; callers
/// with unusual access distributions should size the stash themselves via
/// [`OramConfig::stash_capacity`].
fn default_stash_capacity(bucket_capacity: usize, height: TreeHeight) -> usize {
    (4 * bucket_capacity * (height as usize + 1)).max(128)
}

#[cfg(test)]
impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng>
    GenericOram<D, P, S, R>
{
    /// Asserts that each written id is locatable in exactly one place: a
    /// bucket on the path to its current position-map leaf, or a stash.
    pub(crate) fn assert_path_invariant(&mut self, written: &[BlockId]) {
        for &id in written {
            let location = self.position_map.get(id).unwrap();
            let path = tree::path_to_leaf(location.leaf, self.height);
            let node_offset = location.partition * self.partition_nodes;
            let on_path: Vec<usize> = path
                .iter()
                .map(|node| node_offset + *node as usize)
                .collect();

            let mut bucket_hits = Vec::new();
            for index in 0..self.storage.capacity() {
                let bucket = self.storage.read_bucket(index).unwrap();
                for block in bucket {
                    if block.id == id {
                        bucket_hits.push(index);
                    }
                }
            }
            let stash_hits: usize = self
                .stashes
                .iter()
                .map(|stash| stash.scan().filter(|block| block.id == id).count())
                .sum();

            assert_eq!(
                bucket_hits.len() + stash_hits,
                1,
                "block {id} found {} times in buckets and {} times in stashes",
                bucket_hits.len(),
                stash_hits,
            );
            for index in bucket_hits {
                assert!(
                    on_path.contains(&index),
                    "block {id} stored in bucket {index}, off its path {on_path:?}",
                );
            }
        }
    }

    /// Asserts that no stash holds a block whose current position-map
    /// partition differs from the stash's own partition.
    pub(crate) fn assert_partition_isolation(&self) {
        for (partition, stash) in self.stashes.iter().enumerate() {
            for block in stash.scan() {
                let current = self.position_map.get(block.id).unwrap();
                assert_eq!(
                    current.partition, partition,
                    "block {} stranded in stash {partition}",
                    block.id,
                );
            }
        }
    }
}
