//! Benchmarks for seek planning, index lookups and frame requests.
//!
//! Run with: cargo bench
//!
//! The FFmpeg benchmarks require fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path};

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use framesource::{
    FrameIndex, IndexEntry, IndexProvider, PixelFormat, SeekPlanner, SourceOptions, VideoSource,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// One hour at 25 fps with a keyframe every 250 frames.
fn long_index() -> FrameIndex {
    let entries = (1..=90_000u32)
        .map(|frame| IndexEntry {
            byte_position: Some(i64::from(frame) * 4_096),
            timestamp: Some(i64::from(frame - 1)),
            presentation_timestamp: Some(i64::from(frame - 1)),
            size: 4_096,
            random_access: (frame - 1) % 250 == 0,
        })
        .collect();
    FrameIndex::new(entries)
}

fn benchmark_index_lookups(criterion: &mut Criterion) {
    let index = long_index();

    criterion.bench_function("nearest random access point (90k frames)", |bencher| {
        let mut frame = 1;
        bencher.iter(|| {
            frame = frame % 90_000 + 7_919;
            black_box(index.nearest_random_access_point(black_box(frame)))
        });
    });

    criterion.bench_function("native index records (90k frames)", |bencher| {
        bencher.iter(|| black_box(index.native_records().len()));
    });
}

fn benchmark_seek_planning(criterion: &mut Criterion) {
    let index = long_index();
    let planner = SeekPlanner::default();

    criterion.bench_function("plan sequential request", |bencher| {
        bencher.iter(|| planner.plan(&index, black_box(1_001), Some(1_000)))
    });

    criterion.bench_function("plan random request", |bencher| {
        let mut frame = 1;
        bencher.iter(|| {
            frame = frame % 90_000 + 12_347;
            planner.plan(&index, black_box(frame), Some(45_000))
        });
    });
}

fn benchmark_frame_requests(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let options = || {
        SourceOptions::new()
            .with_cache_index(false)
            .with_format(PixelFormat::Yuv420p8)
    };
    let mut source = VideoSource::open_with_options(SAMPLE_VIDEO, options()).unwrap();

    criterion.bench_function("get frame (sequential)", |bencher| {
        let mut n = 0;
        bencher.iter(|| {
            n = (n + 1) % 150;
            black_box(source.get_frame(n).unwrap())
        });
    });

    criterion.bench_function("get frame (backward jumps)", |bencher| {
        let mut n = 149;
        bencher.iter(|| {
            n = (n + 150 - 37) % 150;
            black_box(source.get_frame(n).unwrap())
        });
    });

    criterion.bench_function("open source", |bencher| {
        bencher.iter(|| VideoSource::open_with_options(SAMPLE_VIDEO, options()).unwrap());
    });
}

criterion::criterion_group!(
    benches,
    benchmark_index_lookups,
    benchmark_seek_planning,
    benchmark_frame_requests,
);

criterion::criterion_main!(benches);
