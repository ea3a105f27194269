// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Combinatorial topology of closed surfaces
//!
//! Everything here is exact integer counting over the mesh connectivity;
//! no vertex positions are consulted.

use super::Mesh;
use serde::{Deserialize, Serialize};

/// Raw vertex, edge and face counts of a polyhedral surface.
///
/// Faces need not be triangles, so quad surfaces can be classified directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyCounts {
    pub vertices: usize,
    pub edges: usize,
    pub faces: usize,
}

impl TopologyCounts {
    pub fn new(vertices: usize, edges: usize, faces: usize) -> Self {
        Self {
            vertices,
            edges,
            faces,
        }
    }

    /// Counts only referenced vertices, so stray vertices do not shift χ.
    pub fn of_mesh(mesh: &Mesh) -> Self {
        let mut referenced = vec![false; mesh.vertex_count()];
        for triangle in &mesh.triangles {
            for &index in &triangle.indices {
                referenced[index] = true;
            }
        }
        Self {
            vertices: referenced.iter().filter(|&&used| used).count(),
            edges: mesh.edge_count(),
            faces: mesh.triangle_count(),
        }
    }

    /// `F - E + V`
    pub fn euler_characteristic(&self) -> i64 {
        self.faces as i64 - self.edges as i64 + self.vertices as i64
    }

    /// Genus-zero test on counts alone: `χ - 2 == 0`.
    pub fn is_simply_connected(&self) -> bool {
        self.euler_characteristic() - 2 == 0
    }
}

/// Topology summary of a mesh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub counts: TopologyCounts,
    pub euler_characteristic: i64,
    /// Every edge borders exactly two faces
    pub closed: bool,
    /// Faces agree on a consistent winding
    pub oriented: bool,
    /// Number of vertex-connected shells
    pub components: usize,
}

impl TopologyReport {
    /// Genus of a single closed oriented shell, `None` otherwise.
    pub fn genus(&self) -> Option<i64> {
        let chi = self.euler_characteristic;
        if self.closed && self.oriented && self.components == 1 && chi <= 2 && chi % 2 == 0 {
            Some((2 - chi) / 2)
        } else {
            None
        }
    }

    pub fn is_simply_connected(&self) -> bool {
        self.closed && self.components == 1 && self.euler_characteristic - 2 == 0
    }

    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              TOPOLOGY                                    ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Vertices:        {:>10}                              ║", self.counts.vertices);
        println!("║ Edges:           {:>10}                              ║", self.counts.edges);
        println!("║ Faces:           {:>10}                              ║", self.counts.faces);
        println!("║ Euler (F-E+V):   {:>10}                              ║", self.euler_characteristic);
        println!("║ Components:      {:>10}                              ║", self.components);
        println!(
            "║ Closed:          {:>10}                              ║",
            if self.closed { "Yes" } else { "No" }
        );
        println!(
            "║ Oriented:        {:>10}                              ║",
            if self.oriented { "Yes" } else { "No" }
        );
        println!(
            "║ Genus:           {:>10}                              ║",
            self.genus().map_or_else(|| "-".to_string(), |g| g.to_string())
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// `F - E + V` of the mesh, counting referenced vertices only.
pub fn euler_characteristic(mesh: &Mesh) -> i64 {
    TopologyCounts::of_mesh(mesh).euler_characteristic()
}

/// True iff the mesh is a single closed surface with `χ - 2 == 0`.
///
/// Connectivity and closure are checked before the Euler test, so a pair of
/// disjoint spheres (χ = 4) or an open disc (χ = 1) never passes.
pub fn is_simply_connected(mesh: &Mesh) -> bool {
    classify(mesh).is_simply_connected()
}

pub fn classify(mesh: &Mesh) -> TopologyReport {
    let counts = TopologyCounts::of_mesh(mesh);
    TopologyReport {
        counts,
        euler_characteristic: counts.euler_characteristic(),
        closed: mesh.is_closed(),
        oriented: mesh.is_oriented(),
        components: count_components(mesh),
    }
}

/// Number of vertex-connected shells among the faces.
pub fn count_components(mesh: &Mesh) -> usize {
    let mut sets = DisjointSet::new(mesh.vertex_count());
    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices;
        sets.union(a, b);
        sets.union(b, c);
    }

    let mut roots: Vec<usize> = mesh
        .triangles
        .iter()
        .map(|t| sets.find(t.indices[0]))
        .collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
}

/// Union-find with path halving
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{primitives, Primitive};
    use nalgebra::Point3;

    #[test]
    fn test_quad_cube_counts_are_simply_connected() {
        let counts = TopologyCounts::new(8, 12, 6);
        assert_eq!(counts.euler_characteristic(), 2);
        assert!(counts.is_simply_connected());
    }

    #[test]
    fn test_quad_torus_counts_are_not_simply_connected() {
        let counts = TopologyCounts::new(16, 32, 16);
        assert_eq!(counts.euler_characteristic() - 2, -2);
        assert!(!counts.is_simply_connected());
    }

    #[test]
    fn test_triangulated_cube() {
        let report = classify(&Primitive::cube(Point3::origin(), 1.0).to_mesh());
        assert_eq!(report.counts, TopologyCounts::new(8, 18, 12));
        assert!(report.is_simply_connected());
        assert_eq!(report.genus(), Some(0));
    }

    #[test]
    fn test_torus_genus_one() {
        let report = classify(&Primitive::torus(Point3::origin(), 2.0, 0.5, 8, 6).to_mesh());
        assert!(!report.is_simply_connected());
        assert_eq!(report.genus(), Some(1));
    }

    #[test]
    fn test_two_shells_fail_even_if_counts_are_adjusted() {
        let two = primitives::merged(&[
            Primitive::cube(Point3::origin(), 1.0),
            Primitive::torus(Point3::new(10.0, 0.0, 0.0), 2.0, 0.5, 8, 6),
        ]);
        // χ = 2 + 0, which a bare count test would accept
        assert_eq!(euler_characteristic(&two), 2);
        assert!(!is_simply_connected(&two));
        assert_eq!(classify(&two).genus(), None);
    }

    #[test]
    fn test_open_surface_is_rejected() {
        let mut mesh = Primitive::cube(Point3::origin(), 1.0).to_mesh();
        mesh.triangles.pop();
        assert!(!is_simply_connected(&mesh));
    }

    #[test]
    fn test_unreferenced_vertices_are_ignored() {
        let mut mesh = Primitive::cube(Point3::origin(), 1.0).to_mesh();
        mesh.add_vertex(Point3::new(9.0, 9.0, 9.0));
        assert_eq!(euler_characteristic(&mesh), 2);
    }
}
