// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::{BoundingBox, PointPool};
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }

    /// The three directed edges in winding order.
    pub fn directed_edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.indices;
        [(a, b), (b, c), (c, a)]
    }

    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }

    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.indices;
        Self::new([a, c, b])
    }
}

/// Undirected edge key with the smaller index first.
pub fn edge_key(a: usize, b: usize) -> [usize; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Triangulated surface. Meshes are treated as values: every geometry
/// operation in the pipeline returns a new mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    pub fn from_parts(vertices: Vec<Point3<f64>>, faces: &[[usize; 3]]) -> Self {
        Self {
            vertices,
            triangles: faces.iter().copied().map(Triangle::new).collect(),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn positions(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        let [a, b, c] = triangle.indices;
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Unnormalized face normal (length is twice the face area).
    pub fn face_normal(&self, face: usize) -> Vector3<f64> {
        let [a, b, c] = self.positions(&self.triangles[face]);
        (b - a).cross(&(c - a))
    }

    /// Unique undirected edges, sorted.
    pub fn edges(&self) -> Vec<[usize; 2]> {
        let mut edges: Vec<[usize; 2]> = self.edge_face_counts().into_keys().collect();
        edges.sort_unstable();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.edge_face_counts().len()
    }

    /// Number of faces bordering each undirected edge.
    pub fn edge_face_counts(&self) -> AHashMap<[usize; 2], usize> {
        let mut counts: AHashMap<[usize; 2], usize> =
            AHashMap::with_capacity(self.triangles.len() * 3 / 2);
        for triangle in &self.triangles {
            for (a, b) in triangle.directed_edges() {
                *counts.entry(edge_key(a, b)).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Every edge borders exactly two faces.
    pub fn is_closed(&self) -> bool {
        !self.triangles.is_empty() && self.edge_face_counts().values().all(|&count| count == 2)
    }

    /// Every directed edge is used once and its reverse is used once, so the
    /// faces agree on a single orientation.
    pub fn is_oriented(&self) -> bool {
        let mut directed: AHashMap<(usize, usize), usize> =
            AHashMap::with_capacity(self.triangles.len() * 3);
        for triangle in &self.triangles {
            for edge in triangle.directed_edges() {
                *directed.entry(edge).or_insert(0) += 1;
            }
        }
        directed
            .iter()
            .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// Signed enclosed volume; positive for outward-facing winding.
    pub fn signed_volume(&self) -> f64 {
        let origin = self.bounding_box().center();
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.positions(t);
                let (a, b, c) = (a - origin, b - origin, c - origin);
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Reverse the winding of every face.
    pub fn flip(&mut self) {
        for triangle in &mut self.triangles {
            *triangle = triangle.flipped();
        }
    }

    /// Flip the mesh if its faces point inward. Returns true if flipped.
    pub fn orient_outward(&mut self) -> bool {
        if self.signed_volume() < 0.0 {
            self.flip();
            true
        } else {
            false
        }
    }

    /// Append another mesh without any CSG.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            let [a, b, c] = triangle.indices;
            self.triangles
                .push(Triangle::new([a + offset, b + offset, c + offset]));
        }
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Mesh {
        Mesh {
            vertices: self.vertices.iter().map(|v| v + offset).collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Weld vertices that are within `epsilon` of each other.
    /// Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }

        let original_count = self.vertices.len();
        let mut pool = PointPool::with_capacity(epsilon, original_count);
        let remap: Vec<usize> = self.vertices.iter().map(|v| pool.insert(*v)).collect();

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                *index = remap[*index];
            }
        }
        self.vertices = pool.into_points();

        original_count - self.vertices.len()
    }

    /// Drop faces with a repeated vertex index and pairs of faces that cover
    /// the same vertices with opposite windings (zero-thickness sheets).
    /// Returns the number of faces removed.
    pub fn remove_degenerate_faces(&mut self) -> usize {
        let original_count = self.triangles.len();
        self.triangles.retain(|t| !t.is_degenerate());

        let mut by_vertices: AHashMap<[usize; 3], Vec<usize>> = AHashMap::new();
        for (i, triangle) in self.triangles.iter().enumerate() {
            let mut key = triangle.indices;
            key.sort_unstable();
            by_vertices.entry(key).or_default().push(i);
        }

        let mut dropped = vec![false; self.triangles.len()];
        for faces in by_vertices.values().filter(|faces| faces.len() > 1) {
            for (i, &fi) in faces.iter().enumerate() {
                if dropped[fi] {
                    continue;
                }
                for &fj in &faces[i + 1..] {
                    if dropped[fj] {
                        continue;
                    }
                    let same_winding = cyclic_eq(
                        &self.triangles[fi].indices,
                        &self.triangles[fj].indices,
                    );
                    dropped[fj] = true;
                    if !same_winding {
                        dropped[fi] = true;
                        break;
                    }
                }
            }
        }

        let mut index = 0;
        self.triangles.retain(|_| {
            let keep = !dropped[index];
            index += 1;
            keep
        });

        original_count - self.triangles.len()
    }

    /// Remove vertices that no face references. Returns the number removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let original_count = self.vertices.len();
        let mut remap = vec![usize::MAX; original_count];
        let mut kept = Vec::with_capacity(original_count);

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                if remap[*index] == usize::MAX {
                    remap[*index] = kept.len();
                    kept.push(self.vertices[*index]);
                }
                *index = remap[*index];
            }
        }

        self.vertices = kept;
        original_count - self.vertices.len()
    }

    /// Weld, drop degenerate faces and compact the vertex list.
    pub fn cleaned(&self, epsilon: f64) -> Mesh {
        let mut mesh = self.clone();
        mesh.weld_vertices(epsilon);
        mesh.remove_degenerate_faces();
        mesh.remove_unreferenced_vertices();
        mesh
    }

    /// Number of edge-connected shells.
    pub fn connected_components(&self) -> usize {
        super::topology::count_components(self)
    }

    pub fn euler_characteristic(&self) -> i64 {
        super::topology::euler_characteristic(self)
    }
}

fn cyclic_eq(a: &[usize; 3], b: &[usize; 3]) -> bool {
    (0..3).any(|shift| (0..3).all(|i| a[i] == b[(i + shift) % 3]))
}
