use criterion::*;
use fuzzy_partition_utils::aligned::AlignedU16s;
use fuzzy_partition_utils::comparator::Smallest;
use fuzzy_partition_utils::partition::{partition_fuzzy, simd_partition_fuzzy};

// Payload sizes for benchmarking (element counts)
pub const PAYLOAD_SIZES: &[usize] = &[
    1024,    // small candidate list
    16384,   // 16 K
    262144,  // 256 K
    2097152, // 2 M
];

// Generate test data of specified size
pub fn generate_test_data(size: usize) -> Vec<u16> {
    (0..size as u64)
        .map(|i| (i.wrapping_mul(2654435761) % 65536) as u16)
        .collect()
}

// Benchmark group configuration
#[cfg(not(target_os = "windows"))]
use pprof::criterion::{Output, PProfProfiler};

#[cfg(not(target_os = "windows"))]
pub fn get_benchmark_config() -> Criterion {
    Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

#[cfg(target_os = "windows")]
pub fn get_benchmark_config() -> Criterion {
    Criterion::default()
}

// Main benchmark function
pub fn run_partition_benchmarks(c: &mut Criterion) {
    for &size in PAYLOAD_SIZES {
        let mut group = c.benchmark_group("partition");
        group.throughput(Throughput::Bytes((size * 2) as u64));

        let data = generate_test_data(size);
        let ids: Vec<u32> = (0..size as u32).collect();
        let q_min = size / 8;
        let q_max = q_min + q_min / 2;

        // u16 fast path (AVX2 when available, same bisection otherwise)
        group.bench_with_input(BenchmarkId::new("u16/simd", size), &data, |b, data| {
            b.iter_batched(
                || (AlignedU16s::from_values(data), ids.clone()),
                |(mut vals, mut ids)| {
                    black_box(simd_partition_fuzzy::<Smallest, u32>(
                        vals.as_mut_slice(),
                        &mut ids,
                        q_min,
                        q_max,
                    ));
                },
                BatchSize::LargeInput,
            )
        });

        // u16 fast path pinned to the scalar kernel
        #[cfg(feature = "bench")]
        group.bench_with_input(
            BenchmarkId::new("u16/scalar_kernel", size),
            &data,
            |b, data| {
                b.iter_batched(
                    || (data.clone(), ids.clone()),
                    |(mut vals, mut ids)| {
                        black_box(
                            fuzzy_partition_utils::partition::bench::partition_fuzzy_u16_scalar_kernel::<
                                Smallest,
                                u32,
                            >(&mut vals, &mut ids, q_min, q_max),
                        );
                    },
                    BatchSize::LargeInput,
                )
            },
        );

        // generic sampling path on f32
        group.bench_with_input(BenchmarkId::new("f32/scalar", size), &data, |b, data| {
            b.iter_batched(
                || {
                    (
                        data.iter().map(|&v| v as f32).collect::<Vec<f32>>(),
                        ids.clone(),
                    )
                },
                |(mut vals, mut ids)| {
                    black_box(partition_fuzzy::<Smallest, f32, u32>(
                        &mut vals, &mut ids, q_min, q_max,
                    ));
                },
                BatchSize::LargeInput,
            )
        });

        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = get_benchmark_config();
    targets = run_partition_benchmarks
}

criterion_main!(benches);
