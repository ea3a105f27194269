// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric predicates for the intersection engine
//! Planes, 2D orientation, segment tests and winding numbers

use super::Mesh;
use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Oriented plane `normal . p = offset` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    /// Plane through a triangle, oriented by its winding. `None` for
    /// zero-area triangles.
    pub fn from_triangle(tri: &[Point3<f64>; 3]) -> Option<Self> {
        let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
        let length = normal.norm();
        if length <= f64::EPSILON {
            return None;
        }
        let normal = normal / length;
        Some(Self {
            normal,
            offset: normal.dot(&tri[0].coords),
        })
    }

    /// Signed distance; positive on the side the normal points to
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }
}

/// Side of a signed distance with a dead band of `eps` around zero
pub fn sign_with_tolerance(value: f64, eps: f64) -> i8 {
    if value > eps {
        1
    } else if value < -eps {
        -1
    } else {
        0
    }
}

/// Point where segment `(p, q)` crosses `plane`, given the signed distances
/// of its endpoints (which must have opposite signs).
pub fn segment_plane_point(p: &Point3<f64>, q: &Point3<f64>, dp: f64, dq: f64) -> Point3<f64> {
    let t = dp / (dp - dq);
    p + (q - p) * t
}

/// Twice the signed area of the 2D triangle `(a, b, c)`; positive for CCW
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Closed point-in-triangle test with an absolute distance tolerance.
pub fn point_in_triangle_2d(p: &Point2<f64>, tri: &[Point2<f64>; 3], tolerance: f64) -> bool {
    let area = orient2d(&tri[0], &tri[1], &tri[2]);
    if area.abs() <= f64::EPSILON {
        return false;
    }
    let sign = area.signum();
    (0..3).all(|i| {
        let a = &tri[i];
        let b = &tri[(i + 1) % 3];
        let length = (b - a).norm();
        // distance of p to the edge line, positive inside
        sign * orient2d(a, b, p) / length >= -tolerance
    })
}

/// Whether the projection of `p` onto the plane of `tri` falls inside `tri`.
pub fn projects_into_triangle(p: &Point3<f64>, tri: &[Point3<f64>; 3], tolerance: f64) -> bool {
    let Some(plane) = Plane::from_triangle(tri) else {
        return false;
    };
    let u = (tri[1] - tri[0]).normalize();
    let v = plane.normal.cross(&u);
    let project = |q: &Point3<f64>| {
        let d = q - tri[0];
        Point2::new(d.dot(&u), d.dot(&v))
    };
    point_in_triangle_2d(&project(p), &tri.map(|q| project(&q)), tolerance)
}

/// Proper crossing of two 2D segments. Returns the parameters `(s, t)` along
/// `(a0, a1)` and `(b0, b1)`, both strictly inside `(margin, 1 - margin)`.
pub fn segment_crossing_2d(
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
    margin: f64,
) -> Option<(f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.x * db.y - da.y * db.x;
    if denom.abs() <= f64::EPSILON * da.norm() * db.norm() {
        return None;
    }
    let w = b0 - a0;
    let s = (w.x * db.y - w.y * db.x) / denom;
    let t = (w.x * da.y - w.y * da.x) / denom;
    let inside = |x: f64| x > margin && x < 1.0 - margin;
    (inside(s) && inside(t)).then_some((s, t))
}

/// Parameter of the projection of `p` on segment `(a, b)` and the distance
/// from `p` to that projection, with the parameter clamped to `[0, 1]`.
pub fn project_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> (f64, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON * f64::EPSILON {
        return (0.0, (p - a).norm());
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (t, (p - (a + ab * t)).norm())
}

/// Signed solid angle subtended by a triangle at `p`
/// (Van Oosterom and Strackee).
pub fn solid_angle(p: &Point3<f64>, tri: &[Point3<f64>; 3]) -> f64 {
    let a = tri[0] - p;
    let b = tri[1] - p;
    let c = tri[2] - p;
    let (la, lb, lc) = (a.norm(), b.norm(), c.norm());
    let numerator = a.dot(&b.cross(&c));
    let denominator = la * lb * lc + a.dot(&b) * lc + a.dot(&c) * lb + b.dot(&c) * la;
    2.0 * numerator.atan2(denominator)
}

/// Generalized winding number of `p` with respect to a closed surface:
/// close to 1 inside an outward-oriented solid, close to 0 outside.
pub fn winding_number(p: &Point3<f64>, mesh: &Mesh) -> f64 {
    let total: f64 = mesh
        .triangles
        .par_iter()
        .map(|t| solid_angle(p, &mesh.positions(t)))
        .sum();
    total / (4.0 * PI)
}
