// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Decision procedure and polygon driver with in-memory collaborators

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use polyvis::analysis::{Edge, InvocationBudget, Polygon, PolygonVisibilityDriver, SegmentEquivalenceAnalyzer};
use polyvis::geometry::{intersect_all, BooleanEngine, Mesh, MeshBooleanEngine, Primitive};
use polyvis::visibility::{FnProvider, VisibilityVolumeProvider, VisibilityVolumeRequest, VolumeParameters};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SCENARIO: [[f64; 3]; 3] = [
    [-110.965, 1.0, 1527.085],
    [-80.035, 1.0, 1526.637],
    [-88.306, 1.0, 1499.653],
];

/// A box around the viewpoint whose size and height depend on the viewpoint,
/// so no two volumes share a face plane.
fn box_volume(viewpoint: Point3<f64>) -> Mesh {
    let center = viewpoint + Vector3::new(0.0, 0.013 * viewpoint.x, 0.0);
    Primitive::cube(center, 60.0 + 0.1 * viewpoint.x.abs()).to_mesh()
}

fn counting_provider(calls: Arc<AtomicUsize>, volume: fn(Point3<f64>) -> Mesh) -> Arc<dyn VisibilityVolumeProvider> {
    Arc::new(FnProvider::new(move |request: &VisibilityVolumeRequest| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(volume(request.viewpoint))
    }))
}

/// Reports a genus-1 intersection whenever the two volumes are centered
/// farther apart than `reach`, and the first volume otherwise.
struct ReachEngine {
    reach: f64,
}

impl BooleanEngine for ReachEngine {
    fn intersect(&self, a: &Mesh, b: &Mesh) -> polyvis::Result<Mesh> {
        let gap = nalgebra::distance(&a.bounding_box().center(), &b.bounding_box().center());
        if gap > self.reach {
            Ok(Primitive::torus(Point3::origin(), 2.0, 0.5, 8, 6).to_mesh())
        } else {
            Ok(a.clone())
        }
    }
}

fn small_cube(viewpoint: Point3<f64>) -> Mesh {
    Primitive::cube(viewpoint, 5.0).to_mesh()
}

#[test]
fn test_identical_volumes_never_subdivide() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = counting_provider(calls.clone(), |_| Primitive::sphere(Point3::origin(), 3.0, 12).to_mesh());
    let analyzer = SegmentEquivalenceAnalyzer::new(
        provider,
        Arc::new(MeshBooleanEngine::default()),
        VolumeParameters::default(),
        4,
    );

    let report = analyzer.analyze_edge(Edge::new(0, 1), Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].depth, 0);
    assert!(report.records[0].equivalent);
    assert_eq!(report.records[0].span, [0.0, 1.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_zero_depth_rejects_at_root() {
    let calls = Arc::new(AtomicUsize::new(0));
    let analyzer = SegmentEquivalenceAnalyzer::new(
        counting_provider(calls.clone(), small_cube),
        Arc::new(ReachEngine { reach: 1.0 }),
        VolumeParameters::default(),
        0,
    );

    let report = analyzer.analyze_edge(Edge::new(2, 0), Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
    assert_eq!(report.records.len(), 1);
    assert!(!report.records[0].equivalent);
    assert_eq!(report.records[0].depth, 0);
    assert!(report.is_complete());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scenario_all_edges_equivalent() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(MeshBooleanEngine::default());
    let polygon = Polygon::from_coordinates(&SCENARIO)?;
    let driver = PolygonVisibilityDriver::new(polygon, counting_provider(calls.clone(), box_volume), engine.clone())
        .max_depth(2);

    let report = driver.evaluate();
    assert_eq!(report.edges.len(), 3);
    assert_eq!(report.leaf_count(), 3);
    assert!(report.records().all(|r| r.depth == 0 && r.equivalent));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let volumes: Vec<Mesh> = SCENARIO.iter().map(|&c| box_volume(Point3::from(c))).collect();
    let expected = intersect_all(engine.as_ref(), &volumes)?;
    let folded = report.polygon_volume.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_relative_eq!(folded.volume(), expected.volume(), max_relative = 1e-9);

    // the fold of three boxes is their common box
    let boxes: Vec<_> = volumes.iter().map(Mesh::bounding_box).collect();
    let lo = boxes.iter().fold(Point3::new(f64::MIN, f64::MIN, f64::MIN), |acc, b| acc.sup(&b.min));
    let hi = boxes.iter().fold(Point3::new(f64::MAX, f64::MAX, f64::MAX), |acc, b| acc.inf(&b.max));
    let analytic = (hi - lo).product();
    assert_relative_eq!(folded.volume(), analytic, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_scenario_subdivision_is_power_of_two() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let polygon = Polygon::from_coordinates(&SCENARIO)?;
    let driver = PolygonVisibilityDriver::new(
        polygon,
        counting_provider(calls.clone(), small_cube),
        Arc::new(ReachEngine { reach: 10.0 }),
    )
    .max_depth(3);

    let report = driver.evaluate();
    // every edge is 28 to 36 long, so quarters are the first pieces within reach
    for edge in &report.edges {
        assert_eq!(edge.records.len(), 4, "edge {}", edge.edge);
        assert!(edge.records.iter().all(|r| r.depth == 2 && r.equivalent));
        assert!(edge.subdivided());
        assert_eq!(edge.records[0].start, report.polygon.vertices()[edge.edge.a]);
        assert_eq!(edge.records[3].end, report.polygon.vertices()[edge.edge.b]);
        for pair in edge.records.windows(2) {
            assert_eq!(pair[0].span[1], pair[1].span[0]);
            assert_eq!(pair[0].end, pair[1].start);
        }
    }
    assert_eq!(report.leaf_count(), 12);
    assert!(report.leaf_count() > 3);
    // 3 vertices plus 3 midpoints per edge
    assert_eq!(calls.load(Ordering::SeqCst), 12);
    assert_eq!(report.invocations, 12);
    assert!(report.polygon_volume.is_ok());
    Ok(())
}

#[test]
fn test_budget_fails_branches_not_the_run() -> Result<()> {
    let polygon = Polygon::from_coordinates(&SCENARIO)?;
    let driver = PolygonVisibilityDriver::new(
        polygon,
        counting_provider(Arc::new(AtomicUsize::new(0)), small_cube),
        Arc::new(ReachEngine { reach: 20.0 }),
    )
    .max_depth(3)
    .budget(InvocationBudget::new(Some(4), None));

    let report = driver.evaluate();
    // three vertices, then only one of the three root midpoints fits
    assert_eq!(report.invocations, 4);
    assert_eq!(report.failure_count(), 2);
    assert_eq!(report.leaf_count(), 2);
    assert!(report
        .edges
        .iter()
        .flat_map(|e| e.failures.iter())
        .all(|f| f.error.kind() == "BudgetExhausted" && f.depth == 0));
    assert!(report.polygon_volume.is_ok());
    Ok(())
}
