// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Non-recursive Path ORAM over a single tree.

use crate::generic_oram::GenericOram;
use crate::position_map::{PositionMap, PositionToken, TokenPositionMap};
use crate::stash::Stash;
use crate::storage::StorageBackend;
use crate::tree::tree_height;
use crate::{
    AccessMetrics, BlockId, BoundedStash, InMemoryPositionMap, MemoryBackend, Oram, OramConfig,
    OramError,
};
use rand::{CryptoRng, RngCore};

/// A Path ORAM with in-memory backends, the usual instantiation.
pub type DefaultPathOram<R> = PathOram<MemoryBackend, InMemoryPositionMap, BoundedStash, R>;

/// Path ORAM: one complete binary tree of buckets, sized so that
/// `ceil(block_count / bucket_capacity)` nodes fit.
pub struct PathOram<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> {
    /// The underlying engine, exposed for benchmarking and testing.
    pub engine: GenericOram<D, P, S, R>,
}

impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> PathOram<D, P, S, R> {
    /// Builds a Path ORAM for `config.block_count` logical blocks.
    pub fn new(config: OramConfig, rng: R) -> Result<Self, OramError> {
        let min_nodes = config.block_count.div_ceil(config.bucket_capacity.max(1));
        let height = tree_height(min_nodes.max(1));
        Ok(Self {
            engine: GenericOram::new(config, height, 1, rng)?,
        })
    }

    /// Installs an observability hook receiving stash occupancies.
    pub fn set_metrics(&mut self, metrics: Box<dyn AccessMetrics>) {
        self.engine.set_metrics(metrics);
    }
}

impl<D: StorageBackend, S: Stash, R: RngCore + CryptoRng> PathOram<D, TokenPositionMap, S, R> {
    /// Replaces the rotating location-derivation secret.
    ///
    /// Token-driven deployments call this before each access; the engine
    /// itself never generates locations in this configuration.
    pub fn set_token(&mut self, token: &PositionToken) {
        self.engine.position_map.set_token(token);
    }
}

impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> Oram
    for PathOram<D, P, S, R>
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
