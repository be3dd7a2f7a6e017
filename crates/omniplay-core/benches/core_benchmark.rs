//! Benchmark tests for omniplay-core operations
//!
//! Run with: cargo bench -p omniplay-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use omniplay_core::sim::SimBackends;
use omniplay_core::{
    can_play_src, parse, BackendKind, EventHub, FallbackCoordinator, MediaConfig, MediaElement,
    NativeLevel, ParseOptions, QualityTable,
};

// ============================================================================
// Helpers
// ============================================================================

fn composite_source(count: usize) -> String {
    let kinds = ["mpd", "m3u8", "mp4", "webm", "txt"];
    (0..count)
        .map(|i| format!("https://cdn.example.com/asset/{}.{}", i, kinds[i % kinds.len()]))
        .collect::<Vec<_>>()
        .join("|")
}

fn ladder(count: usize) -> Vec<NativeLevel> {
    (0..count)
        .map(|i| {
            let height = 240 + (i as u32 % 6) * 180;
            NativeLevel::new(i)
                .with_resolution(height * 16 / 9, height)
                .with_bitrate(400_000 + i as u64 * 350_000)
        })
        .collect()
}

// ============================================================================
// Source parsing
// ============================================================================

fn bench_source_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Source Parsing");
    let options = ParseOptions::default();

    for count in [1, 3, 8, 32] {
        let raw = composite_source(count);
        group.bench_with_input(BenchmarkId::new("parse", count), &raw, |b, raw| {
            b.iter(|| parse(black_box(raw), &options))
        });
    }

    group.bench_function("parse_time_fragment", |b| {
        b.iter(|| parse(black_box("https://cdn.example.com/a.mp4#t=12.5,40"), &options))
    });

    group.bench_function("parse_vimeo", |b| {
        b.iter(|| parse(black_box("https://player.vimeo.com/video/76979871?autoplay=1"), &options))
    });

    group.bench_function("can_play_src", |b| {
        let raw = composite_source(8);
        b.iter(|| can_play_src(black_box(&raw), &options))
    });

    group.finish();
}

// ============================================================================
// Fallback planning
// ============================================================================

fn bench_fallback_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fallback Plan");
    let options = ParseOptions::default();

    for count in [3, 8, 32] {
        let spec = parse(&composite_source(count), &options);
        group.bench_with_input(BenchmarkId::new("build", count), &spec, |b, spec| {
            b.iter(|| FallbackCoordinator::new(black_box(spec), |_| true))
        });
    }

    group.bench_function("walk_plan", |b| {
        let spec = parse(&composite_source(8), &options);
        b.iter(|| {
            let mut coordinator = FallbackCoordinator::new(&spec, |kind| kind != BackendKind::Vimeo);
            let mut attempts = 0;
            while coordinator.next_attempt().is_some() {
                attempts += 1;
            }
            black_box(attempts)
        })
    });

    group.finish();
}

// ============================================================================
// Quality tables
// ============================================================================

fn bench_quality_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quality Table");

    for count in [3, 8, 24] {
        let levels = ladder(count);
        group.bench_with_input(BenchmarkId::new("from_native", count), &levels, |b, levels| {
            b.iter(|| QualityTable::from_native(black_box(levels)))
        });
    }

    group.finish();
}

// ============================================================================
// Session resolution
// ============================================================================

fn bench_session_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Resolution");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let backends = SimBackends::new();
    let activator = backends.activator();
    let hub = Arc::new(EventHub::new());

    group.bench_function("set_src_to_playable", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let element = MediaElement::with_hub(MediaConfig::default(), activator.clone(), hub.clone());
                element.set_src("a.mpd|a.mp4").await.unwrap();
                element.process_signals().await;
                backends.clear_calls();
                black_box(element.ready_state())
            })
        })
    });

    let failing = SimBackends::new();
    failing.fail_playback(BackendKind::Dash, "27");
    failing.fail_playback(BackendKind::Hls, "networkError");
    let failing_activator = failing.activator();

    group.bench_function("fallback_to_native", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let element =
                    MediaElement::with_hub(MediaConfig::default(), failing_activator.clone(), hub.clone());
                element.set_src("a.mpd|a.m3u8|a.mp4").await.unwrap();
                element.process_signals().await;
                failing.clear_calls();
                black_box(element.active_backend())
            })
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_source_parsing,
    bench_fallback_plan,
    bench_quality_table,
    bench_session_resolution,
);

criterion_main!(benches);
