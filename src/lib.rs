// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A position-based Oblivious RAM engine.
//!
//! This crate implements the non-recursive Path ORAM construction and its
//! partitioned variant, Forest ORAM. A caller reads or writes a logical block
//! by its id while the sequence and size of accesses against the storage
//! backend reveal nothing about which id was touched: every operation reads
//! and writes exactly `height + 1` buckets of exactly `bucket_capacity`
//! blocks each, hit or miss, read or write.
//!
//! The engines are generic over three injected collaborators — a
//! [`StorageBackend`], a [`PositionMap`] and a [`Stash`] — plus the random
//! source used to draw leaf and partition assignments. A predictable random
//! source defeats the obliviousness guarantee entirely; production
//! deployments must inject a cryptographically secure RNG.
//!
//! ```
//! use foram::{Oram, OramConfig, DefaultPathOram};
//! use rand::rngs::OsRng;
//!
//! # fn main() -> Result<(), foram::OramError> {
//! let config = OramConfig::new("example", 5, 20, 4);
//! let mut oram = DefaultPathOram::new(config, OsRng)?;
//! oram.write(0, b"HELLO!")?;
//! assert_eq!(oram.read(0)?.as_deref(), Some(&b"HELLO!"[..]));
//! # Ok(())
//! # }
//! ```

use std::num::TryFromIntError;
use thiserror::Error;

pub mod block;
pub mod forest_oram;
pub mod generic_oram;
pub mod path_oram;
pub mod position_map;
pub mod stash;
pub mod storage;
pub mod tree;

#[cfg(test)]
mod test_utils;

pub use block::{Block, Location};
pub use forest_oram::{DefaultForestOram, ForestOram};
pub use path_oram::{DefaultPathOram, PathOram};
pub use position_map::{InMemoryPositionMap, PositionMap, PositionToken, TokenPositionMap};
pub use stash::{BoundedStash, Stash};
pub use storage::{CountingBackend, MemoryBackend, StorageBackend};

/// Numeric type used to identify a logical block.
pub type BlockId = u64;

/// Numeric type used to identify a leaf of an ORAM tree.
/// Leaves are numbered `0..2^height`.
pub type Leaf = u64;

/// The id carried by dummy blocks. Never a valid logical id.
pub const DUMMY_BLOCK_ID: BlockId = BlockId::MAX;

/// Construction parameters shared by both ORAM variants.
///
/// Mirrors the `initialize(name, totalBlocks, blockSize, bucketCapacity)`
/// surface of the engine: `block_count` logical blocks of at most
/// `block_size` bytes each, stored in tree buckets of `bucket_capacity`
/// slots (the parameter "Z" from the Path ORAM literature).
#[derive(Clone, Debug)]
pub struct OramConfig {
    /// Name of the protected store, used only for diagnostics.
    pub name: String,
    /// Number of addressable logical blocks.
    pub block_count: usize,
    /// Maximum payload size of one logical block, in bytes.
    pub block_size: usize,
    /// Number of block slots per tree bucket (Z).
    pub bucket_capacity: usize,
    /// Capacity of each stash, in blocks. `None` selects an empirically safe
    /// default; the right value for unusual workloads is a tuning question,
    /// not a derived bound.
    pub stash_capacity: Option<usize>,
}

impl OramConfig {
    /// A configuration with the default stash sizing.
    pub fn new(name: &str, block_count: usize, block_size: usize, bucket_capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            block_count,
            block_size,
            bucket_capacity,
            stash_capacity: None,
        }
    }
}

/// The error type for ORAM operations.
///
/// Every reachable failure is unrecoverable: the access protocol has no
/// partial-state rollback, so the engine fails fast and leaves durable
/// recovery to the caller (typically a write-ahead log). A read of an id
/// that was never written is *not* an error; it is reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum OramError {
    /// A stash ran out of free slots. Indicates an under-provisioned stash,
    /// not a transient condition.
    #[error("stash capacity of {capacity} blocks exhausted")]
    StashExhausted {
        /// The provisioned capacity of the offending stash.
        capacity: usize,
    },
    /// The derived tree geometry cannot hold the requested number of blocks.
    #[error("requested {requested} blocks but the configured trees hold only {capacity}")]
    CapacityExceeded {
        /// Number of blocks the caller asked for.
        requested: usize,
        /// Number of block slots the geometry provides.
        capacity: usize,
    },
    /// A logical id outside the configured range.
    #[error("block id {id} out of bounds for an ORAM of {capacity} blocks")]
    IndexOutOfBounds {
        /// The offending id.
        id: BlockId,
        /// The configured number of logical blocks.
        capacity: usize,
    },
    /// A payload larger than the configured block size.
    #[error("payload of {size} bytes does not fit the block size of {block_size} bytes")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        size: usize,
        /// The configured block size.
        block_size: usize,
    },
    /// A storage backend produced or was handed a bucket of the wrong shape.
    #[error("bucket {index} holds {actual} blocks, expected {expected}")]
    MalformedBucket {
        /// Flat index of the offending bucket.
        index: usize,
        /// The configured bucket capacity.
        expected: usize,
        /// Number of blocks actually present.
        actual: usize,
    },
    /// Construction parameters that do not describe a usable ORAM.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong with the parameters.
        reason: &'static str,
    },
    /// Arithmetic conversion failure while validating parameters.
    #[error(transparent)]
    IntegerConversion(#[from] TryFromIntError),
}

/// The public read/write surface shared by both ORAM variants.
pub trait Oram {
    /// Obliviously reads the block with the given id.
    ///
    /// Returns `Ok(None)` if the id was never written — the expected outcome
    /// for an empty logical slot, not an error. The returned payload has
    /// exactly the length it was written with.
    fn read(&mut self, id: BlockId) -> Result<Option<Vec<u8>>, OramError>;

    /// Obliviously writes `payload` to the block with the given id.
    ///
    /// Returns the number of bytes written.
    fn write(&mut self, id: BlockId, payload: &[u8]) -> Result<usize, OramError>;

    /// The number of addressable logical blocks.
    fn block_capacity(&self) -> usize;

    /// Releases the position map, the stashes and the storage backend.
    fn close(self) -> Result<(), OramError>
    where
        Self: Sized;
}

/// An injectable observability hook.
///
/// Replaces the build-time instrumentation counters of earlier revisions:
/// deployments that want occupancy statistics inject an implementation at
/// run time instead of recompiling with a flag.
pub trait AccessMetrics {
    /// Called after every access with the occupancy of each stash the
    /// operation touched.
    fn stash_occupancy(&mut self, partition: usize, occupancy: usize);
}
