// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Closed test solids

use super::{Mesh, TopologyCounts, Triangle};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Closed, outward-oriented primitive solids
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cuboid {
        min: Point3<f64>,
        max: Point3<f64>,
    },
    Sphere {
        center: Point3<f64>,
        radius: f64,
        slices: usize,
        stacks: usize,
    },
    Torus {
        center: Point3<f64>,
        major_radius: f64,
        minor_radius: f64,
        major_segments: usize,
        minor_segments: usize,
    },
}

impl Primitive {
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self::Cuboid { min, max }
    }

    /// Axis-aligned cube of edge `size` centered on `center`.
    pub fn cube(center: Point3<f64>, size: f64) -> Self {
        let half = Vector3::repeat(size / 2.0);
        Self::Cuboid {
            min: center - half,
            max: center + half,
        }
    }

    pub fn sphere(center: Point3<f64>, radius: f64, segments: usize) -> Self {
        let segments = if segments >= 3 { segments } else { 16 };
        Self::Sphere {
            center,
            radius,
            slices: segments,
            stacks: segments.max(3) / 2 + 1,
        }
    }

    /// Torus around the local Y axis.
    pub fn torus(
        center: Point3<f64>,
        major_radius: f64,
        minor_radius: f64,
        major_segments: usize,
        minor_segments: usize,
    ) -> Self {
        Self::Torus {
            center,
            major_radius,
            minor_radius,
            major_segments: major_segments.max(3),
            minor_segments: minor_segments.max(3),
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = match self {
            Self::Cuboid { min, max } => generate_cuboid_mesh(min, max),
            Self::Sphere {
                center,
                radius,
                slices,
                stacks,
            } => generate_sphere_mesh(center, *radius, *slices, *stacks),
            Self::Torus {
                center,
                major_radius,
                minor_radius,
                major_segments,
                minor_segments,
            } => generate_torus_mesh(
                center,
                *major_radius,
                *minor_radius,
                *major_segments,
                *minor_segments,
            ),
        };
        mesh.orient_outward();
        mesh
    }

    /// Vertex, edge and face counts of the same solid built from quads
    /// instead of triangles. Spheres have triangular caps and no quad form.
    pub fn quad_counts(&self) -> Option<TopologyCounts> {
        match self {
            Self::Cuboid { .. } => Some(TopologyCounts::new(8, 12, 6)),
            Self::Torus {
                major_segments,
                minor_segments,
                ..
            } => {
                let quads = major_segments * minor_segments;
                Some(TopologyCounts::new(quads, 2 * quads, quads))
            }
            Self::Sphere { .. } => None,
        }
    }
}

/// Concatenate several primitives into one mesh without any CSG.
pub fn merged(parts: &[Primitive]) -> Mesh {
    let mut mesh = Mesh::new();
    for part in parts {
        mesh.merge(&part.to_mesh());
    }
    mesh
}

fn generate_cuboid_mesh(min: &Point3<f64>, max: &Point3<f64>) -> Mesh {
    let vertices = vec![
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    let faces = [
        // z+
        [4, 5, 6],
        [4, 6, 7],
        // z-
        [1, 0, 3],
        [1, 3, 2],
        // x+
        [5, 1, 2],
        [5, 2, 6],
        // x-
        [0, 4, 7],
        [0, 7, 3],
        // y+
        [7, 6, 2],
        [7, 2, 3],
        // y-
        [0, 1, 5],
        [0, 5, 4],
    ];

    Mesh::from_parts(vertices, &faces)
}

fn generate_sphere_mesh(center: &Point3<f64>, radius: f64, slices: usize, stacks: usize) -> Mesh {
    let mut mesh = Mesh::with_capacity(2 + slices * (stacks - 1), 2 * slices * (stacks - 1));

    let north = mesh.add_vertex(center + Vector3::new(0.0, radius, 0.0));
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            mesh.add_vertex(
                center
                    + Vector3::new(
                        radius * phi.sin() * theta.cos(),
                        radius * phi.cos(),
                        radius * phi.sin() * theta.sin(),
                    ),
            );
        }
    }
    let south = mesh.add_vertex(center + Vector3::new(0.0, -radius, 0.0));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + (j % slices);

    for j in 0..slices {
        mesh.add_triangle(Triangle::new([north, ring(1, j + 1), ring(1, j)]));
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let (u0, u1) = (ring(i, j), ring(i, j + 1));
            let (l0, l1) = (ring(i + 1, j), ring(i + 1, j + 1));
            mesh.add_triangle(Triangle::new([u0, u1, l1]));
            mesh.add_triangle(Triangle::new([u0, l1, l0]));
        }
    }
    for j in 0..slices {
        mesh.add_triangle(Triangle::new([south, ring(stacks - 1, j), ring(stacks - 1, j + 1)]));
    }

    mesh
}

fn generate_torus_mesh(
    center: &Point3<f64>,
    major_radius: f64,
    minor_radius: f64,
    major_segments: usize,
    minor_segments: usize,
) -> Mesh {
    let mut mesh = Mesh::with_capacity(
        major_segments * minor_segments,
        2 * major_segments * minor_segments,
    );

    for i in 0..major_segments {
        let u = 2.0 * PI * i as f64 / major_segments as f64;
        for j in 0..minor_segments {
            let v = 2.0 * PI * j as f64 / minor_segments as f64;
            let r = major_radius + minor_radius * v.cos();
            mesh.add_vertex(center + Vector3::new(r * u.cos(), minor_radius * v.sin(), r * u.sin()));
        }
    }

    let index = |i: usize, j: usize| (i % major_segments) * minor_segments + (j % minor_segments);
    for i in 0..major_segments {
        for j in 0..minor_segments {
            let a = index(i, j);
            let b = index(i + 1, j);
            let c = index(i + 1, j + 1);
            let d = index(i, j + 1);
            mesh.add_triangle(Triangle::new([a, b, c]));
            mesh.add_triangle(Triangle::new([a, c, d]));
        }
    }

    mesh
}
