use criterion::*;
use fuzzy_partition_utils::histogram::{simd_histogram_16, simd_histogram_8};

// Payload sizes for benchmarking (element counts)
pub const PAYLOAD_SIZES: &[usize] = &[
    4096,     // 8 KiB
    65536,    // 128 KiB
    1048576,  // 2 MiB
    8388608,  // 16 MiB
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
pub fn run_histogram_benchmarks(c: &mut Criterion) {
    for &size in PAYLOAD_SIZES {
        let mut group = c.benchmark_group("histogram");
        group.throughput(Throughput::Bytes((size * 2) as u64));
        let mut memcpy_buf = vec![0u16; size];

        // Prepare test data
        let data = generate_test_data(size);

        // 8 bins, preprocessed (min/shift mapping)
        group.bench_with_input(BenchmarkId::new("8bin/shifted", size), &data, |b, data| {
            b.iter(|| {
                let mut hist = [0u32; 8];
                simd_histogram_8(black_box(data), 0, 8, &mut hist);
                hist
            })
        });

        // 16 bins, preprocessed
        group.bench_with_input(BenchmarkId::new("16bin/shifted", size), &data, |b, data| {
            b.iter(|| {
                let mut hist = [0u32; 16];
                simd_histogram_16(black_box(data), 0, 8, &mut hist);
                hist
            })
        });

        // 16 bins, raw values
        group.bench_with_input(BenchmarkId::new("16bin/raw", size), &data, |b, data| {
            b.iter(|| {
                let mut hist = [0u32; 16];
                simd_histogram_16(black_box(data), 0, -1, &mut hist);
                hist
            })
        });

        // Scalar reference impl.
        #[cfg(feature = "bench")]
        group.bench_with_input(
            BenchmarkId::new("16bin/reference", size),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut hist = [0u32; 16];
                    fuzzy_partition_utils::histogram::bench::histogram_16_reference(
                        black_box(data),
                        0,
                        8,
                        &mut hist,
                    );
                    hist
                })
            },
        );

        // Memcpy baseline
        group.bench_with_input(BenchmarkId::new("memcpy", size), &data, |b, data| {
            b.iter(|| memcpy_buf.copy_from_slice(data))
        });

        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = get_benchmark_config();
    targets = run_histogram_benchmarks
}

criterion_main!(benches);
