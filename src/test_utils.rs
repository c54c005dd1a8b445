// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Shared test machinery: logging setup, workload drivers and the invariant
//! hooks they check after every run.

use crate::forest_oram::ForestOram;
use crate::path_oram::PathOram;
use crate::position_map::PositionMap;
use crate::stash::Stash;
use crate::storage::StorageBackend;
use crate::{BlockId, Oram};
use duplicate::duplicate_item;
use rand::{rngs::StdRng, CryptoRng, Rng, RngCore, SeedableRng};
use std::fs::File;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Routes `log` output to `test.log`. Call at the top of any test whose
/// debug trace you may want to inspect; repeated calls are no-ops.
pub(crate) fn init_logger() {
    INIT_LOGGER.call_once(|| {
        simplelog::WriteLogger::init(
            simplelog::LevelFilter::Debug,
            simplelog::Config::default(),
            File::create("test.log").unwrap(),
        )
        .unwrap();
    });
}

/// A random payload of between 1 and `max_len` bytes.
pub(crate) fn random_payload<R: Rng>(rng: &mut R, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(1..=max_len);
    let mut payload = vec![0u8; len];
    rng.fill(payload.as_mut_slice());
    payload
}

/// Structural checks an engine must pass after any workload.
pub(crate) trait Testable {
    fn assert_invariants(&mut self, written: &[BlockId]);
}

#[duplicate_item(oram_type; [PathOram]; [ForestOram])]
impl<D: StorageBackend, P: PositionMap, S: Stash, R: RngCore + CryptoRng> Testable
    for oram_type<D, P, S, R>
{
    fn assert_invariants(&mut self, written: &[BlockId]) {
        self.engine.assert_path_invariant(written);
        self.engine.assert_partition_isolation();
    }
}

/// Random reads and writes over the full id range, checked against a plain
/// in-memory mirror, with a full invariant sweep at the end.
pub(crate) fn test_random_workload<T: Oram + Testable>(oram: &mut T, block_size: usize, ops: usize) {
    let block_count = oram.block_capacity();
    let mut rng = StdRng::seed_from_u64(block_count as u64);
    let mut mirror: Vec<Option<Vec<u8>>> = vec![None; block_count];

    for _ in 0..ops {
        let id = rng.gen_range(0..block_count as u64);
        if rng.gen::<bool>() {
            let payload = random_payload(&mut rng, block_size);
            assert_eq!(oram.write(id, &payload).unwrap(), payload.len());
            mirror[id as usize] = Some(payload);
        } else {
            assert_eq!(oram.read(id).unwrap(), mirror[id as usize]);
        }
    }

    let written: Vec<BlockId> = mirror
        .iter()
        .enumerate()
        .filter(|(_, payload)| payload.is_some())
        .map(|(id, _)| id as u64)
        .collect();
    oram.assert_invariants(&written);
}

/// Sequential write-all then read-all rounds; every id stays live, so the
/// final sweep checks the whole address space.
pub(crate) fn test_linear_workload<T: Oram + Testable>(
    oram: &mut T,
    block_size: usize,
    ops: usize,
) {
    let block_count = oram.block_capacity();
    let mut rng = StdRng::seed_from_u64(!(block_count as u64));
    let mut mirror: Vec<Vec<u8>> = Vec::with_capacity(block_count);

    for id in 0..block_count as u64 {
        let payload = random_payload(&mut rng, block_size);
        oram.write(id, &payload).unwrap();
        mirror.push(payload);
    }

    let rounds = ops.div_ceil(block_count.max(1)).max(1);
    for _ in 0..rounds {
        for id in 0..block_count as u64 {
            assert_eq!(oram.read(id).unwrap().as_deref(), Some(&mirror[id as usize][..]));
        }
    }

    let written: Vec<BlockId> = (0..block_count as u64).collect();
    oram.assert_invariants(&written);
}

/// Generates a random-workload and a linear-workload test for the ORAM type
/// named by `$oram` (an alias in scope at the call site) with the given
/// geometry.
macro_rules! create_workload_tests {
    ($oram:ident, $name:ident, $block_count:expr, $block_size:expr, $bucket_capacity:expr, $ops:expr) => {
        paste::paste! {
            #[test]
            fn [<$name _random_workload_ $block_count x $block_size x $bucket_capacity>]() {
                crate::test_utils::init_logger();
                let config = crate::OramConfig::new(
                    stringify!($name),
                    $block_count,
                    $block_size,
                    $bucket_capacity,
                );
                let rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
                let mut oram = $oram::new(config, rng).unwrap();
                crate::test_utils::test_random_workload(&mut oram, $block_size, $ops);
            }

            #[test]
            fn [<$name _linear_workload_ $block_count x $block_size x $bucket_capacity>]() {
                crate::test_utils::init_logger();
                let config = crate::OramConfig::new(
                    stringify!($name),
                    $block_count,
                    $block_size,
                    $bucket_capacity,
                );
                let rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(1);
                let mut oram = $oram::new(config, rng).unwrap();
                crate::test_utils::test_linear_workload(&mut oram, $block_size, $ops);
            }
        }
    };
}
pub(crate) use create_workload_tests;
