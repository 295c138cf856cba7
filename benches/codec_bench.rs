/// Benchmarks for the binary unit codec.
///
/// Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use man_toolchain::domain::codec::WireMessage;
use man_toolchain::domain::unit::{Key, SourceUnit};

// ═══════════════════════════════════════════════════════════════════════════
// Synthetic Data Generators
// ═══════════════════════════════════════════════════════════════════════════

/// Create a man page unit with `num_files` files and as many dependencies.
fn create_synthetic_unit(num_files: usize) -> SourceUnit {
    let files = (0..num_files)
        .map(|i| format!("posix/man1/cmd_{}.1p.txt", i))
        .collect();
    let mut unit = SourceUnit::new(Key::new("ManPages", "man"), files);
    unit.info.dependencies = (0..num_files)
        .map(|i| Key::new("ManPages", format!("dep_{}", i)))
        .collect();
    unit.info.data = Some(vec![0xab; num_files * 4]);
    unit
}

// ═══════════════════════════════════════════════════════════════════════════
// Encode / Decode
// ═══════════════════════════════════════════════════════════════════════════

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode");

    for num_files in [10, 100, 1000].iter() {
        let unit = create_synthetic_unit(*num_files);
        group.throughput(Throughput::Elements(*num_files as u64));

        group.bench_with_input(BenchmarkId::new("files", num_files), &unit, |b, unit| {
            b.iter(|| black_box(unit).encode().unwrap())
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/decode");

    for num_files in [10, 100, 1000].iter() {
        let bytes = create_synthetic_unit(*num_files).encode().unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("files", num_files), &bytes, |b, bytes| {
            b.iter(|| SourceUnit::decode(black_box(bytes)).unwrap())
        });
    }

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// JSON comparison
// ═══════════════════════════════════════════════════════════════════════════

fn bench_json_vs_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/json_vs_binary");
    let unit = create_synthetic_unit(500);

    group.bench_function("binary_round_trip", |b| {
        b.iter(|| SourceUnit::decode(&black_box(&unit).encode().unwrap()).unwrap())
    });

    group.bench_function("json_round_trip", |b| {
        b.iter(|| {
            let text = serde_json::to_vec(black_box(&unit)).unwrap();
            serde_json::from_slice::<SourceUnit>(&text).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_json_vs_binary);
criterion_main!(benches);
