// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point3;
use polyvis::geometry::{topology, BooleanEngine, MeshBooleanEngine, Primitive};

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    group.bench_function("cube", |b| {
        b.iter(|| Primitive::cube(black_box(Point3::origin()), black_box(10.0)).to_mesh());
    });

    for segments in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::new("sphere", segments), &segments, |b, &segments| {
            b.iter(|| Primitive::sphere(Point3::origin(), black_box(10.0), segments).to_mesh());
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    for segments in [16, 64] {
        let sphere = Primitive::sphere(Point3::origin(), 5.0, segments).to_mesh();
        group.bench_with_input(BenchmarkId::new("sphere", segments), &sphere, |b, mesh| {
            b.iter(|| topology::classify(black_box(mesh)));
        });
    }

    let torus = Primitive::torus(Point3::origin(), 4.0, 1.0, 48, 24).to_mesh();
    group.bench_function("torus_48x24", |b| {
        b.iter(|| topology::is_simply_connected(black_box(&torus)));
    });

    group.finish();
}

fn bench_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection");
    group.sample_size(20);
    let engine = MeshBooleanEngine::default();

    let a = Primitive::cube(Point3::origin(), 10.0).to_mesh();
    let b = Primitive::cube(Point3::new(3.1, 4.2, 2.7), 10.0).to_mesh();
    group.bench_function("box_box", |bench| {
        bench.iter(|| engine.intersect(black_box(&a), black_box(&b)).unwrap());
    });

    for segments in [16, 32] {
        let sphere = Primitive::sphere(Point3::new(0.5, 0.3, 0.2), 6.0, segments).to_mesh();
        group.bench_with_input(BenchmarkId::new("box_sphere", segments), &sphere, |bench, sphere| {
            bench.iter(|| engine.intersect(black_box(&a), black_box(sphere)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_classification, bench_intersection);
criterion_main!(benches);
