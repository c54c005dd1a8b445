// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Benchmarks comparing Path ORAM against its partitioned Forest variant.

use core::fmt;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fmt::Display;
use std::time::Duration;

use foram::{
    BoundedStash, CountingBackend, ForestOram, InMemoryPositionMap, MemoryBackend, Oram,
    OramConfig, PathOram,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const CAPACITIES_TO_BENCHMARK: [usize; 3] = [1 << 10, 1 << 14, 1 << 16];
const BLOCK_SIZE: usize = 64;
const BUCKET_CAPACITY: usize = 4;
const NUM_RANDOM_OPERATIONS_TO_RUN: usize = 64;

type BenchmarkPathOram =
    PathOram<CountingBackend<MemoryBackend>, InMemoryPositionMap, BoundedStash, StdRng>;
type BenchmarkForestOram =
    ForestOram<CountingBackend<MemoryBackend>, InMemoryPositionMap, BoundedStash, StdRng>;

trait Instrumented: Oram + Sized {
    fn build(capacity: usize) -> Self;
    fn get_read_count(&self) -> u64;
    fn get_write_count(&self) -> u64;
    fn short_name() -> String;
}

impl Instrumented for BenchmarkPathOram {
    fn build(capacity: usize) -> Self {
        let config = OramConfig::new("bench", capacity, BLOCK_SIZE, BUCKET_CAPACITY);
        Self::new(config, StdRng::seed_from_u64(0)).unwrap()
    }

    fn get_read_count(&self) -> u64 {
        self.engine.storage.read_count()
    }

    fn get_write_count(&self) -> u64 {
        self.engine.storage.write_count()
    }

    fn short_name() -> String {
        "PathOram".into()
    }
}

impl Instrumented for BenchmarkForestOram {
    fn build(capacity: usize) -> Self {
        let config = OramConfig::new("bench", capacity, BLOCK_SIZE, BUCKET_CAPACITY);
        Self::new(config, StdRng::seed_from_u64(0)).unwrap()
    }

    fn get_read_count(&self) -> u64 {
        self.engine.storage.read_count()
    }

    fn get_write_count(&self) -> u64 {
        self.engine.storage.write_count()
    }

    fn short_name() -> String {
        "ForestOram".into()
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().warm_up_time(Duration::new(0, 1_000_000_00)).measurement_time(Duration::new(0, 1_000_000_00)).sample_size(10);
    targets =
    benchmark_initialization::<BenchmarkPathOram>,
    benchmark_initialization::<BenchmarkForestOram>,
    benchmark_read::<BenchmarkPathOram>,
    benchmark_read::<BenchmarkForestOram>,
    benchmark_write::<BenchmarkPathOram>,
    benchmark_write::<BenchmarkForestOram>,
    benchmark_random_operations::<BenchmarkPathOram>,
    benchmark_random_operations::<BenchmarkForestOram>,
    print_access_counts_header,
    count_accesses_on_read::<BenchmarkPathOram>,
    count_accesses_on_read::<BenchmarkForestOram>,
    count_accesses_on_write::<BenchmarkPathOram>,
    count_accesses_on_write::<BenchmarkForestOram>,
);
criterion_main!(benches);

fn benchmark_initialization<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::initialization");
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                block_size: BLOCK_SIZE,
            }),
            capacity,
            |b, capacity| b.iter(|| T::build(*capacity)),
        );
    }
}

fn benchmark_read<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::read");
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        let mut oram = T::build(*capacity);
        group.bench_function(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                block_size: BLOCK_SIZE,
            }),
            |b| b.iter(|| oram.read(0)),
        );
    }
}

fn benchmark_write<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::write");
    let payload = [0u8; BLOCK_SIZE];
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        let mut oram = T::build(*capacity);
        group.bench_function(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                block_size: BLOCK_SIZE,
            }),
            |b| b.iter(|| oram.write(0, &payload)),
        );
    }
}

fn benchmark_random_operations<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::random_operations");
    let mut rng = StdRng::seed_from_u64(0);

    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut oram = T::build(capacity);

        let parameters = &RandomOperationsParameters {
            capacity,
            block_size: BLOCK_SIZE,
            number_of_operations_to_run: NUM_RANDOM_OPERATIONS_TO_RUN,
        };

        let mut index_randomness = vec![0u64; NUM_RANDOM_OPERATIONS_TO_RUN];
        let mut read_versus_write_randomness = vec![false; NUM_RANDOM_OPERATIONS_TO_RUN];
        for index in index_randomness.iter_mut() {
            *index = rng.gen_range(0..capacity as u64);
        }
        rng.fill(&mut read_versus_write_randomness[..]);

        group.bench_with_input(
            BenchmarkId::from_parameter(parameters),
            parameters,
            |b, _parameters| {
                b.iter(|| {
                    run_many_random_accesses(
                        &mut oram,
                        black_box(&index_randomness),
                        black_box(&read_versus_write_randomness),
                    )
                })
            },
        );
    }
    group.finish();
}

fn run_many_random_accesses<T: Instrumented>(
    oram: &mut T,
    index_randomness: &[u64],
    read_versus_write_randomness: &[bool],
) {
    let payload = [1u8; BLOCK_SIZE];
    for (id, is_read) in index_randomness.iter().zip(read_versus_write_randomness) {
        if *is_read {
            oram.read(*id).unwrap();
        } else {
            oram.write(*id, &payload).unwrap();
        }
    }
}

fn count_accesses_on_operation<T: Instrumented, F: Fn(&mut T)>(operation: F) {
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut oram = T::build(capacity);

        let read_count_before = oram.get_read_count();
        let write_count_before = oram.get_write_count();

        operation(&mut oram);

        let reads_due_to_operation = oram.get_read_count() - read_count_before;
        let writes_due_to_operation = oram.get_write_count() - write_count_before;

        println!(
            "{0: <16} | {1: <12} | {2: <12} | {3: <12}",
            T::short_name(),
            capacity,
            reads_due_to_operation,
            writes_due_to_operation,
        );
    }
}

fn print_access_counts_header(_: &mut Criterion) {
    println!(
        "{0: <16} | {1: <12} | {2: <12} | {3: <12}",
        "ORAM", "Capacity", "Reads", "Writes",
    );
}

fn count_accesses_on_read<T: Instrumented>(_: &mut Criterion) {
    count_accesses_on_operation(|oram: &mut T| {
        oram.read(0).unwrap();
    });
}

fn count_accesses_on_write<T: Instrumented>(_: &mut Criterion) {
    count_accesses_on_operation(|oram: &mut T| {
        oram.write(0, &[0u8; BLOCK_SIZE]).unwrap();
    });
}

#[derive(Clone, Copy)]
struct ReadWriteParameters {
    capacity: usize,
    block_size: usize,
}

impl Display for ReadWriteParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(Capacity: {}, Block size: {})",
            self.capacity, self.block_size,
        )
    }
}

#[derive(Clone, Copy)]
struct RandomOperationsParameters {
    capacity: usize,
    block_size: usize,
    number_of_operations_to_run: usize,
}

impl Display for RandomOperationsParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(Capacity: {}, Block size: {}, Ops: {})",
            self.capacity, self.block_size, self.number_of_operations_to_run,
        )
    }
}
