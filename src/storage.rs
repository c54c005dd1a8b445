// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The untrusted storage the engine obliviously accesses on behalf of its
//! client.

use crate::{Block, OramError};

/// A backend persisting fixed-capacity buckets addressed by flat index.
///
/// Bucket `i` owns the block slots `i * Z .. (i + 1) * Z`; the partitioned
/// engine adds a per-partition node offset before addressing.
/// Implementations must preserve the exact byte length of each block's
/// payload and, where present, its location tag. I/O failures are fatal to
/// the engine; a backend needing retries must retry internally.
pub trait StorageBackend
where
    Self: Sized,
{
    /// Opens storage for `total_buckets` buckets of `bucket_capacity` blocks
    /// of at most `block_size` bytes, initially all dummies. `name`
    /// identifies the store for diagnostics.
    fn new(
        name: &str,
        total_buckets: usize,
        bucket_capacity: usize,
        block_size: usize,
    ) -> Result<Self, OramError>;

    /// Reads the full bucket at `index`: exactly `bucket_capacity` blocks.
    fn read_bucket(&mut self, index: usize) -> Result<Vec<Block>, OramError>;

    /// Overwrites the bucket at `index` with exactly `bucket_capacity`
    /// blocks.
    fn write_bucket(&mut self, index: usize, bucket: Vec<Block>) -> Result<(), OramError>;

    /// The number of buckets held.
    fn capacity(&self) -> usize;

    /// Releases backend resources.
    fn close(&mut self) -> Result<(), OramError>;
}

/// A backend keeping every bucket in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    blocks: Vec<Block>,
    bucket_capacity: usize,
}

impl StorageBackend for MemoryBackend {
    fn new(
        name: &str,
        total_buckets: usize,
        bucket_capacity: usize,
        block_size: usize,
    ) -> Result<Self, OramError> {
        if bucket_capacity == 0 {
            return Err(OramError::InvalidConfiguration {
                reason: "bucket capacity must be nonzero",
            });
        }

        log::debug!(
            "MemoryBackend::new -- {} ({} buckets of {} blocks, block size {})",
            name,
            total_buckets,
            bucket_capacity,
            block_size
        );

        let mut blocks = Vec::new();
        blocks.resize_with(total_buckets * bucket_capacity, Block::dummy);
        Ok(Self {
            blocks,
            bucket_capacity,
        })
    }

    fn read_bucket(&mut self, index: usize) -> Result<Vec<Block>, OramError> {
        let first = index * self.bucket_capacity;
        let bucket = self.blocks[first..first + self.bucket_capacity].to_vec();
        Ok(bucket)
    }

    fn write_bucket(&mut self, index: usize, bucket: Vec<Block>) -> Result<(), OramError> {
        if bucket.len() != self.bucket_capacity {
            return Err(OramError::MalformedBucket {
                index,
                expected: self.bucket_capacity,
                actual: bucket.len(),
            });
        }

        let first = index * self.bucket_capacity;
        for (offset, block) in bucket.into_iter().enumerate() {
            self.blocks[first + offset] = block;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.blocks.len() / self.bucket_capacity
    }

    fn close(&mut self) -> Result<(), OramError> {
        self.blocks = Vec::new();
        Ok(())
    }
}

/// A backend wrapper that counts bucket reads and writes.
///
/// The access counters are what the fixed-shape tests and benchmarks
/// observe: a correct engine issues the same number of bucket reads and
/// writes for every operation, whatever the id.
#[derive(Debug)]
pub struct CountingBackend<D> {
    inner: D,
    /// `reads[i]` counts the reads of bucket `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` counts the writes of bucket `i`.
    pub writes: Vec<u64>,
}

impl<D> CountingBackend<D> {
    /// The total number of bucket reads.
    pub fn read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// The total number of bucket writes.
    pub fn write_count(&self) -> u64 {
        self.writes.iter().sum()
    }
}

impl<D: StorageBackend> StorageBackend for CountingBackend<D> {
    fn new(
        name: &str,
        total_buckets: usize,
        bucket_capacity: usize,
        block_size: usize,
    ) -> Result<Self, OramError> {
        Ok(Self {
            inner: D::new(name, total_buckets, bucket_capacity, block_size)?,
            reads: vec![0; total_buckets],
            writes: vec![0; total_buckets],
        })
    }

    fn read_bucket(&mut self, index: usize) -> Result<Vec<Block>, OramError> {
        log::debug!("Physical bucket read -- {}", index);
        self.reads[index] += 1;
        self.inner.read_bucket(index)
    }

    fn write_bucket(&mut self, index: usize, bucket: Vec<Block>) -> Result<(), OramError> {
        log::debug!("Physical bucket write -- {}", index);
        self.writes[index] += 1;
        self.inner.write_bucket(index, bucket)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn close(&mut self) -> Result<(), OramError> {
        self.inner.close()
    }
}
