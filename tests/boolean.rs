// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid intersection properties

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use polyvis::error::{BooleanFailure, VisibilityError};
use polyvis::geometry::topology;
use polyvis::geometry::{BooleanConfig, BooleanEngine, Mesh, MeshBooleanEngine, Primitive, Triangle};

fn engine() -> MeshBooleanEngine {
    MeshBooleanEngine::default()
}

/// Box built from quads. `alternate` reverses the vertex numbering and
/// splits every quad along its other diagonal.
fn quad_box(min: Point3<f64>, max: Point3<f64>, alternate: bool) -> Mesh {
    let corner = |i: usize| {
        Point3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    };
    let id = |i: usize| if alternate { 7 - i } else { i };
    let quads = [
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 2, 3, 1],
        [4, 5, 7, 6],
    ];

    let vertices = (0..8).map(|k| corner(id(k))).collect();
    let triangles = quads
        .iter()
        .flat_map(|&[p, q, r, s]| {
            if alternate {
                [[q, r, s], [q, s, p]]
            } else {
                [[p, q, r], [p, r, s]]
            }
        })
        .map(|t| Triangle::new(t.map(id)))
        .collect();
    Mesh { vertices, triangles }
}

/// Intersect in both orders and check both results are one genus-0 solid
/// of the expected volume.
fn assert_commutes(a: &Mesh, b: &Mesh, volume: f64, epsilon: f64) -> Result<()> {
    for (first, second) in [(a, b), (b, a)] {
        let result = engine().intersect(first, second)?;
        assert!(topology::is_simply_connected(&result));
        assert_relative_eq!(result.volume(), volume, epsilon = epsilon);
    }
    Ok(())
}

#[test]
fn test_idempotent_on_identical_geometry() -> Result<()> {
    for mesh in [
        Primitive::cube(Point3::new(1.0, 2.0, 3.0), 4.0).to_mesh(),
        Primitive::sphere(Point3::origin(), 1.5, 16).to_mesh(),
    ] {
        let result = engine().intersect(&mesh, &mesh)?;
        assert_eq!(
            topology::euler_characteristic(&result),
            topology::euler_characteristic(&mesh)
        );
        assert_relative_eq!(result.volume(), mesh.volume(), max_relative = 1e-9);
    }
    Ok(())
}

#[test]
fn test_idempotent_on_retriangulated_copy() -> Result<()> {
    let min = Point3::new(1.0, 2.0, 3.0);
    let max = Point3::new(3.0, 3.5, 4.0);
    let a = quad_box(min, max, false);
    let b = quad_box(min, max, true);

    let output = engine().intersect_with_stats(&a, &b)?;
    assert!(output.stats.coplanar_pairs > 0);
    assert!(topology::is_simply_connected(&output.mesh));

    assert_commutes(&a, &b, 3.0, 1e-9)?;
    let bbox = engine().intersect(&b, &a)?.bounding_box();
    assert_relative_eq!(bbox.min, min, epsilon = 1e-9);
    assert_relative_eq!(bbox.max, max, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_boxes_sharing_face_planes_commute() -> Result<()> {
    let unit = Primitive::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).to_mesh();

    // overlapping half, four shared planes
    let half = Primitive::cuboid(Point3::new(0.5, 0.0, 0.0), Point3::new(1.5, 1.0, 1.0)).to_mesh();
    assert_commutes(&unit, &half, 0.5, 1e-9)?;

    // resting on the floor of the unit box
    let inner = Primitive::cuboid(Point3::new(0.2, 0.3, 0.0), Point3::new(0.7, 0.8, 0.5)).to_mesh();
    assert_commutes(&unit, &inner, 0.125, 1e-9)?;
    Ok(())
}

#[test]
fn test_near_coincident_faces_commute() -> Result<()> {
    let tol = BooleanConfig::default().weld_tolerance;
    let unit = Primitive::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).to_mesh();

    // bottom faces offset by d, inside, at and beyond the weld tolerance
    for d in [0.0, 0.5 * tol, 1.5 * tol, 3.0 * tol, 8.0 * tol, 10.0 * tol, 20.0 * tol] {
        let sharing_z = unit.translated(&Vector3::new(0.5, d, 0.0));
        assert_commutes(&unit, &sharing_z, 0.5 * (1.0 - d), 1e-5)?;

        let skewed = unit.translated(&Vector3::new(0.37, d, 0.21));
        assert_commutes(&unit, &skewed, 0.63 * (1.0 - d) * 0.79, 1e-5)?;
    }
    Ok(())
}

#[test]
fn test_offset_boxes_commute() -> Result<()> {
    let a = Primitive::cube(Point3::origin(), 1.0).to_mesh();
    let b = Primitive::cube(Point3::new(0.3, 0.4, 0.45), 1.0).to_mesh();

    let ab = engine().intersect(&a, &b)?;
    let ba = engine().intersect(&b, &a)?;

    assert!(topology::is_simply_connected(&ab));
    assert_eq!(
        topology::is_simply_connected(&ab),
        topology::is_simply_connected(&ba)
    );
    assert_relative_eq!(ab.volume(), 0.7 * 0.6 * 0.55, epsilon = 1e-9);
    assert_relative_eq!(ab.volume(), ba.volume(), epsilon = 1e-9);

    let (box_ab, box_ba) = (ab.bounding_box(), ba.bounding_box());
    assert_relative_eq!(box_ab.min, box_ba.min, epsilon = 1e-9);
    assert_relative_eq!(box_ab.max, box_ba.max, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_contained_sphere_commutes() -> Result<()> {
    let outer = Primitive::cube(Point3::origin(), 4.0).to_mesh();
    let inner = Primitive::sphere(Point3::new(0.2, -0.1, 0.3), 1.0, 16).to_mesh();

    let a = engine().intersect(&outer, &inner)?;
    let b = engine().intersect(&inner, &outer)?;
    assert!(topology::is_simply_connected(&a));
    assert!(topology::is_simply_connected(&b));
    assert_relative_eq!(a.volume(), inner.volume(), max_relative = 1e-9);
    assert_relative_eq!(b.volume(), inner.volume(), max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_disjoint_solids_fail() {
    let a = Primitive::cube(Point3::origin(), 1.0).to_mesh();
    let b = Primitive::cube(Point3::new(5.0, 0.0, 0.0), 1.0).to_mesh();

    match engine().intersect(&a, &b) {
        Err(VisibilityError::BooleanFailure(BooleanFailure::Disjoint)) => {}
        other => panic!("expected Disjoint, got {other:?}"),
    }
}

#[test]
fn test_slab_through_torus_is_disconnected() -> Result<()> {
    // the slab cuts the ring in two places, leaving two separate pieces
    let torus = Primitive::torus(Point3::origin(), 2.0, 0.5, 16, 8).to_mesh();
    let slab = Primitive::cuboid(Point3::new(-0.5, -1.0, -3.0), Point3::new(0.5, 1.0, 3.0)).to_mesh();

    match engine().intersect(&torus, &slab) {
        Err(VisibilityError::BooleanFailure(BooleanFailure::Disconnected { components })) => {
            assert_eq!(components, 2)
        }
        other => panic!("expected Disconnected, got {other:?}"),
    }

    let lenient = MeshBooleanEngine::new(BooleanConfig {
        require_single_component: false,
        ..BooleanConfig::default()
    });
    let pieces = lenient.intersect(&slab, &torus)?;
    let report = topology::classify(&pieces);
    assert_eq!(report.components, 2);
    assert!(report.closed);
    assert!(!report.is_simply_connected());
    Ok(())
}

#[test]
fn test_invalid_input_names_operand() {
    let good = Primitive::cube(Point3::origin(), 1.0).to_mesh();
    let mut open = good.clone();
    open.triangles.truncate(10);

    match engine().intersect(&good, &open) {
        Err(VisibilityError::BooleanFailure(BooleanFailure::InvalidInput { which, .. })) => {
            assert_eq!(which, 'B')
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}
