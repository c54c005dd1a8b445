// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Tracking of the current (partition, leaf) assignment of every logical
//! block.

use crate::tree::{leaf_count, TreeConfig};
use crate::{BlockId, Location, OramError};
use rand::{CryptoRng, Rng, RngCore};

/// A rotating location-derivation secret: four 32-bit words, the size of one
/// AES block.
pub type PositionToken = [u32; 4];

/// A Path ORAM position map.
///
/// Re-randomizing a block's location on every access is what provides
/// unlinkability across repeated accesses to the same id, so [`update`]
/// (PositionMap::update) runs unconditionally on every read and write.
pub trait PositionMap
where
    Self: Sized,
{
    /// Creates a map assigning every one of `block_count` logical blocks a
    /// uniformly random initial location within `config`.
    fn new<R: RngCore + CryptoRng>(
        block_count: usize,
        config: &TreeConfig,
        rng: &mut R,
    ) -> Result<Self, OramError>;

    /// The current location of the given block.
    fn get(&self, id: BlockId) -> Result<Location, OramError>;

    /// Replaces the stored location with a fresh uniformly random one and
    /// returns the new location.
    fn update<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        rng: &mut R,
    ) -> Result<Location, OramError>;
}

/// A position map holding one location per block in a flat array.
#[derive(Debug)]
pub struct InMemoryPositionMap {
    map: Vec<Location>,
    height: u32,
    partitions: usize,
}

impl InMemoryPositionMap {
    fn random_location<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Location {
        Location {
            partition: rng.gen_range(0..self.partitions),
            leaf: rng.gen_range(0..leaf_count(self.height)),
        }
    }
}

impl PositionMap for InMemoryPositionMap {
    fn new<R: RngCore + CryptoRng>(
        block_count: usize,
        config: &TreeConfig,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        if config.partitions == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "position map needs at least one partition",
            });
        }

        let mut result = Self {
            map: Vec::with_capacity(block_count),
            height: config.height,
            partitions: config.partitions,
        };
        for _ in 0..block_count {
            let location = result.random_location(rng);
            result.map.push(location);
        }
        Ok(result)
    }

    fn get(&self, id: BlockId) -> Result<Location, OramError> {
        let index = usize::try_from(id)?;
        match self.map.get(index) {
            Some(location) => Ok(*location),
            None => Err(OramError::IndexOutOfBounds {
                id,
                capacity: self.map.len(),
            }),
        }
    }

    fn update<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        rng: &mut R,
    ) -> Result<Location, OramError> {
        let fresh = self.random_location(rng);
        let index = usize::try_from(id)?;
        match self.map.get_mut(index) {
            Some(location) => {
                *location = fresh;
                Ok(fresh)
            }
            None => Err(OramError::IndexOutOfBounds {
                id,
                capacity: self.map.len(),
            }),
        }
    }
}

/// A position map deriving locations from an externally supplied rotating
/// token instead of the random source.
///
/// Word 0 of the token selects the leaf and word 2 the partition; an update
/// rotates words 1 and 3 into their place, so the outer protocol supplies
/// the current and the next location with each token. Useful when that
/// protocol must control or audit location derivation. The derivation
/// ignores the block id: the token stream is the single source of truth, one
/// token per access.
#[derive(Debug)]
pub struct TokenPositionMap {
    token: PositionToken,
    height: u32,
    partitions: usize,
}

impl TokenPositionMap {
    /// Replaces the rotating secret.
    pub fn set_token(&mut self, token: &PositionToken) {
        self.token = *token;
    }
}

impl PositionMap for TokenPositionMap {
    fn new<R: RngCore + CryptoRng>(
        _block_count: usize,
        config: &TreeConfig,
        _rng: &mut R,
    ) -> Result<Self, OramError> {
        if config.partitions == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "position map needs at least one partition",
            });
        }

        Ok(Self {
            token: PositionToken::default(),
            height: config.height,
            partitions: config.partitions,
        })
    }

    fn get(&self, _id: BlockId) -> Result<Location, OramError> {
        Ok(Location {
            partition: self.token[2] as usize % self.partitions,
            leaf: u64::from(self.token[0]) % leaf_count(self.height),
        })
    }

    fn update<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        _rng: &mut R,
    ) -> Result<Location, OramError> {
        // Shift the next token words forward; the following get() sees the
        // fresh location.
        self.token[0] = self.token[1];
        self.token[2] = self.token[3];
        self.get(id)
    }
}
