// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for the sequencer model
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - One routing pass, as run on every engine tick
//! - Routed-state lookups made by parameter getters
//! - Packed step layer access
//! - Project serialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use seq_model::routing::{Route, Source};
use seq_model::sequence::note;
use seq_model::serialize::{from_bytes, to_bytes};
use seq_model::types::ModelEnum;
use seq_model::{Project, Routing, Target, TickGate, TrackMode, ROUTE_COUNT, TRACK_COUNT};

fn routed_project(route_count: usize) -> Project {
    let targets = [
        Target::Transpose,
        Target::Octave,
        Target::Rotate,
        Target::GateProbabilityBias,
        Target::Divisor,
        Target::FirstStep,
        Target::LastStep,
        Target::SlideTime,
    ];
    let mut project = Project::new();
    for index in 0..route_count.min(ROUTE_COUNT) {
        let target = if index == 0 {
            Target::Tempo
        } else {
            targets[index % targets.len()]
        };
        let mut route = Route::new(target, index % TRACK_COUNT).expect("track in range");
        route.set_source(Source::from_index(1 + index % 4));
        // ignore conflicts, the table just ends up with fewer routes
        let _ = project.routing_mut().set_route(index, route);
    }
    project
}

/// Benchmark a full routing pass (runs once per tick)
fn bench_update_routes(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_routes");

    for count in [1, 4, ROUTE_COUNT].iter() {
        let mut project = routed_project(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            let mut phase = 0.0f32;
            b.iter(|| {
                phase = (phase + 0.01) % 1.0;
                project.update_routes(|_| black_box(phase));
            })
        });
    }

    group.finish();
}

/// Benchmark pushing one value to every track
fn bench_write_routed(c: &mut Criterion) {
    let gate = TickGate::new();
    let mut project = Project::new();
    for (index, mode) in TrackMode::ALL.iter().cycle().take(TRACK_COUNT).enumerate() {
        project.set_track_mode(&gate, index, *mode);
    }

    c.bench_function("write_routed_all_tracks", |b| {
        b.iter(|| {
            project.write_routed(black_box(Target::Transpose), 0xff, 12, 12.0);
        })
    });
}

/// Benchmark the routed-state lookup made by every parameter getter
fn bench_is_routed(c: &mut Criterion) {
    let project = routed_project(ROUTE_COUNT);
    let routing: &Routing = project.routing();

    c.bench_function("is_routed", |b| {
        b.iter(|| {
            let mut count = 0;
            for track in 0..TRACK_COUNT {
                if routing.is_routed(black_box(Target::Octave), track) {
                    count += 1;
                }
            }
            black_box(count)
        })
    });
}

/// Benchmark packed step layer access
fn bench_step_layers(c: &mut Criterion) {
    let mut step = note::Step::default();

    c.bench_function("note_step_set_layers", |b| {
        b.iter(|| {
            for &layer in note::Layer::ALL {
                step.set_layer_value(layer, black_box(3));
            }
        })
    });

    c.bench_function("note_step_get_layers", |b| {
        b.iter(|| {
            let mut sum = 0;
            for &layer in note::Layer::ALL {
                sum += step.layer_value(black_box(layer));
            }
            black_box(sum)
        })
    });
}

/// Benchmark project serialization
fn bench_project_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_serialization");
    let project = routed_project(ROUTE_COUNT);
    let bytes = to_bytes(&project).expect("project serializes");

    group.bench_function("to_bytes", |b| {
        b.iter(|| black_box(to_bytes(black_box(&project)).expect("project serializes")))
    });

    group.bench_function("from_bytes", |b| {
        let mut decoded = Project::new();
        b.iter(|| {
            from_bytes(black_box(&bytes), &mut decoded).expect("project deserializes");
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_update_routes,
    bench_write_routed,
    bench_is_routed,
    bench_step_layers,
    bench_project_serialization,
);
criterion_main!(benches);
