//! Track Assignment Benchmarks
//!
//! Lane assignment and matrix rendering over dense generated regions.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ng_core::{Beats, MidiRegion, Note, SamplePosition};
use ng_tracker::{TrackerMatrix, TrackerPattern};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const NOTE_COUNTS: &[usize] = &[100, 1000, 10000];

fn generate_notes(count: usize, seed: u64) -> Vec<Note> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Note::new(
                0,
                Beats::from_ticks(rng.random_range(0..256 * 960)),
                Beats::from_ticks(rng.random_range(1..2 * 960)),
                rng.random_range(36..96),
                100,
            )
        })
        .collect()
}

fn region() -> MidiRegion {
    MidiRegion::new("bench", SamplePosition::ZERO, Beats::ZERO, Beats::from_beats(256))
}

/// Benchmark pattern build (sort + lane assignment + row placement)
fn bench_pattern_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_build");
    let region = region();

    for &count in NOTE_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        let notes = generate_notes(count, 42);

        group.bench_with_input(BenchmarkId::new("rpb_4", count), &count, |b, _| {
            b.iter(|| black_box(TrackerPattern::build(&notes, &region, 4)))
        });
    }

    group.finish();
}

/// Benchmark dense matrix rendering
fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix");
    let region = region();

    for &count in NOTE_COUNTS {
        let notes = generate_notes(count, 7);
        let pattern = TrackerPattern::build(&notes, &region, 4);

        group.bench_with_input(BenchmarkId::new("from_pattern", count), &count, |b, _| {
            b.iter(|| black_box(TrackerMatrix::from_pattern(&pattern)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pattern_build, bench_matrix);
criterion_main!(benches);
