use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rollsink::{RollSink, RollSinkBuilder};
use tempfile::TempDir;

const LINE: &[u8] = b"a log line with a realistic amount of content in it\n";
const LINES_PER_ITER: usize = 1000;

fn build_sink(rt: &tokio::runtime::Runtime, dir: &TempDir, cap_bytes: u64) -> RollSink {
    let _guard = rt.enter();
    RollSinkBuilder::new("bench", dir.path())
        .max_file_bytes(cap_bytes)
        .build()
        .unwrap()
}

/// Steady appends: the cap is never reached, every write reuses the handle.
fn bench_steady_appends(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("steady_appends");
    group.throughput(Throughput::Bytes((LINE.len() * LINES_PER_ITER) as u64));

    group.bench_function("write_1000_lines", |b| {
        b.iter_with_setup(
            || {
                let dir = TempDir::new().unwrap();
                let sink = build_sink(&rt, &dir, 512 * 1024 * 1024);
                (dir, sink)
            },
            |(_dir, sink)| {
                for _ in 0..LINES_PER_ITER {
                    (&sink).write(black_box(LINE)).unwrap();
                }
            },
        );
    });

    group.finish();
}

/// Rotation-heavy: a small cap forces a version bump every few writes.
fn bench_rotation_heavy(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("rotation_heavy");
    group.throughput(Throughput::Bytes((LINE.len() * LINES_PER_ITER) as u64));

    // ~10 lines per file before the cap trips.
    group.bench_function("rotate_every_10_lines", |b| {
        b.iter_with_setup(
            || {
                let dir = TempDir::new().unwrap();
                let sink = build_sink(&rt, &dir, (LINE.len() * 10) as u64);
                (dir, sink)
            },
            |(_dir, sink)| {
                for _ in 0..LINES_PER_ITER {
                    (&sink).write(black_box(LINE)).unwrap();
                }
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_steady_appends, bench_rotation_heavy);
criterion_main!(benches);
